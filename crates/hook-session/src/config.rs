//! Session configuration storage
//!
//! Reads and writes `hookwire.json` in a configuration directory.

use std::path::{Path, PathBuf};

use hook_graph::MethodSet;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// File name of the session configuration
pub const CONFIG_FILE: &str = "hookwire.json";

fn default_layout_debounce_ms() -> u64 {
    1000
}

fn default_undo_depth() -> usize {
    100
}

/// Settings for an editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Methods the service node exposes ports for
    #[serde(default)]
    pub methods: MethodSet,
    /// Quiet period before the editor layout is saved
    #[serde(default = "default_layout_debounce_ms")]
    pub layout_debounce_ms: u64,
    /// Number of undo snapshots kept
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,
    /// Directory for the JSON file store, relative to the configuration
    /// directory unless absolute; the configuration directory when unset
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            methods: MethodSet::default(),
            layout_debounce_ms: default_layout_debounce_ms(),
            undo_depth: default_undo_depth(),
            storage_dir: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from disk, falling back to defaults when absent
    pub async fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILE);

        if !fs::try_exists(&config_path).await.map_err(ConfigError::Io)? {
            log::debug!("No configuration at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .await
            .map_err(ConfigError::Io)?;

        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(dir).await.map_err(ConfigError::Io)?;

        let config_path = dir.join(CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(&config_path, contents)
            .await
            .map_err(ConfigError::Io)?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    pub fn layout_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.layout_debounce_ms)
    }

    /// Where the file store keeps its records for a configuration directory
    pub fn storage_path(&self, config_dir: &Path) -> PathBuf {
        match &self.storage_dir {
            Some(dir) => config_dir.join(dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
