//! `channelz list` command: list servers or top-level channels.

use clap::{Args, ValueEnum};

use crate::inspect::Inspector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    #[value(alias = "server")]
    Servers,
    #[value(alias = "channel")]
    Channels,
}

#[derive(Args)]
pub struct ListArgs {
    /// What to list
    pub kind: ListKind,
}

pub async fn execute(
    inspector: &Inspector<'_>,
    args: ListArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = std::io::stdout().lock();
    match args.kind {
        ListKind::Servers => inspector.list_servers(&mut out).await?,
        ListKind::Channels => inspector.list_channels(&mut out).await?,
    }
    Ok(())
}
