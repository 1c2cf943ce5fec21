//! Configuration management for npm-accel

pub mod schema;
pub mod settings;

pub use schema::{Config, LogFormat};
pub use settings::{default_cache_directory, parse_cache_limit, Overrides, Settings};

use crate::error::{AccelError, AccelResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("npm-accel")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub async fn load(&self) -> AccelResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found at {}, using defaults", self.config_path.display());
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> AccelResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| AccelError::io(format!("reading config from {}", path.display()), e))?;

        debug!("Loaded config from {}", path.display());
        toml::from_str(&content).map_err(|e| AccelError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
