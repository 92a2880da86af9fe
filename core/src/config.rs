use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ChannelzError, Result};

/// Default channelz endpoint
pub const DEFAULT_ADDRESS: &str = "http://localhost:50051";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpoint of the process exposing the channelz service
    pub address: String,

    /// Deadline for a whole invocation, in seconds
    pub timeout_secs: u64,

    /// Entities requested per listing page
    pub page_size: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            timeout_secs: 10,
            page_size: 100,
        }
    }
}

impl ClientConfig {
    /// Path of the per-user config file (`~/.config/channelz/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("channelz").join("config.yaml"))
    }

    /// Load configuration from a YAML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            ChannelzError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: ClientConfig = serde_yaml::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the per-user config file, or defaults if there is none.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size <= 0 {
            return Err(ChannelzError::ConfigError(format!(
                "page_size must be positive, got {}",
                self.page_size
            )));
        }
        if self.address.is_empty() {
            return Err(ChannelzError::ConfigError(
                "address must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
