//! CLI command definitions and dispatch.

mod describe;
mod list;

use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use channelz_core::{ClientConfig, GrpcSource};

use crate::inspect::Inspector;

/// Inspect the channelz state of a running gRPC process.
#[derive(Parser)]
#[command(name = "channelz", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection options shared by every command.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Address of the channelz service [default: http://localhost:50051]
    #[arg(long, global = true)]
    pub addr: Option<String>,

    /// Deadline for the whole invocation, in seconds [default: 10]
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Entities requested per listing page [default: 100]
    #[arg(long, global = true)]
    pub page_size: Option<i64>,

    /// Config file (default: ~/.config/channelz/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    /// Load the config file, then apply flag overrides.
    pub fn resolve_config(&self) -> channelz_core::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::load_default()?,
        };
        if let Some(addr) = &self.addr {
            config.address = addr.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Show the detail of one entity
    Describe(describe::DescribeArgs),
    /// List servers or top-level channels
    List(list::ListArgs),
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.connection.resolve_config()?;
    tracing::debug!(address = %config.address, timeout_secs = config.timeout_secs, "Connecting");

    let source = GrpcSource::connect(&config.address, config.timeout()).await?;
    let inspector = Inspector::new(&source, config.page_size, Utc::now());

    match cli.command {
        Command::Describe(args) => describe::execute(&inspector, args).await,
        Command::List(args) => list::execute(&inspector, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use channelz_core::ChannelzError;

    #[test]
    fn test_parse_describe() {
        let cli = Cli::try_parse_from(["channelz", "describe", "channel", "foo1"]).unwrap();
        assert!(matches!(cli.command, Command::Describe(_)));
        assert!(cli.connection.addr.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "channelz",
            "list",
            "servers",
            "--addr",
            "http://10.0.0.1:9000",
            "--page-size",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.connection.addr.as_deref(), Some("http://10.0.0.1:9000"));
        assert_eq!(cli.connection.page_size, Some(5));
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["channelz", "describe", "pipe", "1"]).is_err());
    }

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir, "address: http://file:1\npage_size: 7\n");

        let args = ConnectionArgs {
            addr: Some("http://flag:2".to_string()),
            config: Some(path),
            ..Default::default()
        };
        let config = args.resolve_config().unwrap();
        assert_eq!(config.address, "http://flag:2");
        assert_eq!(config.page_size, 7);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_page_size_flag() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir, "page_size: 50\n");

        let args = ConnectionArgs {
            page_size: Some(0),
            config: Some(path),
            ..Default::default()
        };
        assert!(matches!(
            args.resolve_config(),
            Err(ChannelzError::ConfigError(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let args = ConnectionArgs {
            config: Some(PathBuf::from("/nonexistent/channelz.yaml")),
            ..Default::default()
        };
        assert!(args.resolve_config().is_err());
    }
}
