//! Configuration schema for npm-accel
//!
//! Configuration is stored at `~/.config/npm-accel/config.toml`. Every
//! field is optional; command-line flags and environment variables take
//! precedence over anything set here.

use crate::installer::InstallerKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache settings
    pub cache: CacheConfig,

    /// Installer settings
    pub install: InstallConfig,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// General application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: LogFormat,
}

/// Cache settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding cache archives
    pub directory: Option<PathBuf>,

    /// Maximum number of archives to keep
    pub limit: Option<usize>,
}

/// Installer settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Installer to use instead of auto-detection
    pub installer: Option<InstallerKind>,

    /// Install production dependencies only
    pub production: Option<bool>,
}
