//! `channelz describe` command: show the detail of one entity.

use clap::{Args, ValueEnum};

use channelz_core::EntityKind;

use crate::inspect::Inspector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Server,
    Channel,
    Subchannel,
    Socket,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Server => EntityKind::Server,
            KindArg::Channel => EntityKind::Channel,
            KindArg::Subchannel => EntityKind::Subchannel,
            KindArg::Socket => EntityKind::Socket,
        }
    }
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Kind of entity
    pub kind: KindArg,

    /// Entity ID, or exact name for servers and channels
    pub identifier: String,
}

pub async fn execute(
    inspector: &Inspector<'_>,
    args: DescribeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = std::io::stdout().lock();
    inspector
        .describe(&mut out, args.kind.into(), &args.identifier)
        .await?;
    Ok(())
}
