//! Workspace configuration.
//!
//! A rapport workspace keeps its configuration in `.rapport/config.yaml`.
//! Every path in the file is relative to the workspace root (the directory
//! containing `.rapport/`).

use crate::confirm::DEFAULT_CONFIRM_TIMEOUT;
use crate::error::{Error, Result};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Name of the workspace directory
pub const RAPPORT_DIR_NAME: &str = ".rapport";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the graph data file
pub const GRAPHS_FILE_NAME: &str = "graphs.jsonl";

/// Name of the designated-channel file
pub const CHANNELS_FILE_NAME: &str = "channels.yaml";

/// Name of the member roster file
pub const MEMBERS_FILE_NAME: &str = "members.yaml";

/// Prefix that marks chat messages as commands
pub const DEFAULT_COMMAND_PREFIX: &str = "-";

/// Public URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RapportConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Designated-channel registry file
    pub channels_file: String,

    /// Member roster file
    pub members_file: String,

    /// Where published graphs go
    pub publish: PublishConfig,

    /// Scratch directory for rendered documents
    pub artifacts_dir: String,

    /// Seconds a clear confirmation stays open
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Prefix for chat-style commands
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Storage backend type: "jsonl" (persistent) or "memory" (ephemeral)
    pub backend: String,

    /// Path to the data file
    pub data_file: String,
}

/// Publishing configuration section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishConfig {
    /// Directory published documents are copied into
    pub directory: String,

    /// URL the directory is served under
    pub base_url: String,
}

fn default_confirm_timeout_secs() -> u64 {
    DEFAULT_CONFIRM_TIMEOUT.as_secs()
}

fn default_command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}

impl Default for RapportConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: "jsonl".to_string(),
                data_file: format!("{RAPPORT_DIR_NAME}/{GRAPHS_FILE_NAME}"),
            },
            channels_file: format!("{RAPPORT_DIR_NAME}/{CHANNELS_FILE_NAME}"),
            members_file: format!("{RAPPORT_DIR_NAME}/{MEMBERS_FILE_NAME}"),
            publish: PublishConfig {
                directory: "public".to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
            },
            artifacts_dir: format!("{RAPPORT_DIR_NAME}/artifacts"),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            command_prefix: default_command_prefix(),
        }
    }
}

impl RapportConfig {
    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Reject values that would make the workspace unusable.
    pub fn validate(&self) -> Result<()> {
        if self.command_prefix.is_empty() || self.command_prefix.chars().any(char::is_whitespace) {
            return Err(Error::Config(
                "command_prefix must be non-empty and contain no whitespace".to_string(),
            ));
        }
        if self.confirm_timeout_secs == 0 {
            return Err(Error::Config("confirm_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Confirmation window as a duration
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

impl StorageConfig {
    /// Resolve the storage backend relative to `root`.
    pub fn to_backend(&self, root: &Path) -> Result<StorageBackend> {
        match self.backend.as_str() {
            "jsonl" => Ok(StorageBackend::Jsonl(root.join(&self.data_file))),
            "memory" => Ok(StorageBackend::InMemory),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{other}' (expected 'jsonl' or 'memory')"
            ))),
        }
    }
}

/// Join a configured path onto the workspace root.
pub fn resolve_path(root: &Path, configured: &str) -> PathBuf {
    root.join(configured)
}
