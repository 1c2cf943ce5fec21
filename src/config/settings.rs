//! Effective settings resolved from flags, environment and config file
//!
//! Each field takes the first value found in this order:
//!
//! | Field | Flag | Environment | Config file | Default |
//! |-------|------|-------------|-------------|---------|
//! | cache directory | `--cache-directory` | | `cache.directory` | system or user cache dir |
//! | cache limit | `--cache-limit` | `NPM_ACCEL_CACHE_LIMIT` | `cache.limit` | 20 |
//! | production | `--production` | `NODE_ENV=production` | `install.production` | false |
//! | installer | `--installer` | | `install.installer` | auto-detect |

use super::schema::{Config, LogFormat};
use crate::accelerator::DEFAULT_CACHE_LIMIT;
use crate::error::{AccelError, AccelResult};
use crate::installer::{InstallerKind, InstallerSelection};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the cache limit
pub const CACHE_LIMIT_ENV: &str = "NPM_ACCEL_CACHE_LIMIT";

/// Directory used for the shared cache when running as root
const SYSTEM_CACHE_PARENT: &str = "/var/cache";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cache_directory: Option<PathBuf>,
    pub cache_limit: Option<String>,
    pub production: bool,
    pub installer: Option<InstallerKind>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub cache_directory: PathBuf,
    pub cache_limit: usize,
    pub production: bool,
    pub installer: InstallerSelection,
    pub log_format: LogFormat,
}

impl Settings {
    /// Resolve settings; `env` looks up environment variables
    pub fn resolve<F>(overrides: &Overrides, config: &Config, env: F) -> AccelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_limit = match (&overrides.cache_limit, env(CACHE_LIMIT_ENV), config.cache.limit) {
            (Some(raw), _, _) => parse_cache_limit(raw)?,
            (None, Some(raw), _) => parse_cache_limit(&raw)?,
            (None, None, Some(0)) => return Err(AccelError::InvalidCacheLimit("0".to_string())),
            (None, None, Some(limit)) => limit,
            (None, None, None) => DEFAULT_CACHE_LIMIT,
        };

        let cache_directory = overrides
            .cache_directory
            .clone()
            .or_else(|| config.cache.directory.clone())
            .map(|p| expand_home(&p))
            .unwrap_or_else(default_cache_directory);

        let production = overrides.production
            || env("NODE_ENV").is_some_and(|v| v == "production")
            || config.install.production.unwrap_or(false);

        let installer = InstallerSelection::from(overrides.installer.or(config.install.installer));

        let settings = Self {
            cache_directory,
            cache_limit,
            production,
            installer,
            log_format: config.general.log_format,
        };
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }
}

/// Parse a cache limit, which must be a positive integer
pub fn parse_cache_limit(raw: &str) -> AccelResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(AccelError::InvalidCacheLimit(raw.to_string())),
    }
}

/// Cache directory used when none is configured
pub fn default_cache_directory() -> PathBuf {
    let system = Path::new(SYSTEM_CACHE_PARENT);
    if running_as_root() && is_writable(system) {
        return system.join("npm-accel");
    }

    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("npm-accel")
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Whether a file can be created in `dir`
fn is_writable(dir: &Path) -> bool {
    tempfile::tempfile_in(dir).is_ok()
}
