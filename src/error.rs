//! Error types for npm-accel
//!
//! All modules use `AccelResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for npm-accel operations
pub type AccelResult<T> = Result<T, AccelError>;

/// All errors that can occur in npm-accel
#[derive(Error, Debug)]
pub enum AccelError {
    // Manifest errors
    #[error("Missing package.json file: {0}")]
    ManifestNotFound(PathBuf),

    // Installer resolution errors
    #[error("Installer not found on the search path: {name}")]
    InstallerNotFound { name: String },

    #[error("No supported installer found on the search path (tried {tried})")]
    NoInstallerAvailable { tried: String },

    #[error("Missing Node.js interpreter (expected to find 'nodejs' or 'node')")]
    NodeInterpreterNotFound,

    #[error("Failed to determine version of {program}: {reason}")]
    InstallerVersion { program: String, reason: String },

    // Installer execution errors
    #[error(
        "Installer command failed: {command} (exit code: {}): {stderr}",
        display_code(.exit_code)
    )]
    InstallerExecution {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to start installer: {command}")]
    InstallerSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Failed to extract cache entry {key}: {source}")]
    CacheExtraction {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write cache entry {key}: {source}")]
    CacheWrite {
        key: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid cache limit {0:?}: expected a positive integer")]
    InvalidCacheLimit(String),

    // IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl AccelError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an installer execution error
    pub fn installer_exec(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::InstallerExecution {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Name of the phase in which the error occurred
    pub fn phase(&self) -> &'static str {
        match self {
            Self::ManifestNotFound(_) => "manifest lookup",
            Self::InstallerNotFound { .. }
            | Self::NoInstallerAvailable { .. }
            | Self::NodeInterpreterNotFound
            | Self::InstallerVersion { .. } => "installer resolution",
            Self::InstallerExecution { .. } | Self::InstallerSpawn { .. } => "installer execution",
            Self::CacheExtraction { .. } => "cache extraction",
            Self::CacheWrite { .. } => "cache write",
            Self::ConfigInvalid { .. } | Self::InvalidCacheLimit(_) => "configuration",
            Self::Io { .. } | Self::Internal(_) => "internal",
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ManifestNotFound(_) => {
                Some("Run npm-accel in (or pass) a directory containing package.json")
            }
            Self::NoInstallerAvailable { .. } => {
                Some("Install npm or yarn and make sure it is on $PATH")
            }
            Self::NodeInterpreterNotFound => Some("Install Node.js and make sure it is on $PATH"),
            Self::CacheExtraction { .. } => {
                Some("Re-run with --update to rebuild the cache entry, or delete it manually")
            }
            Self::InvalidCacheLimit(_) => Some("Check --cache-limit and $NPM_ACCEL_CACHE_LIMIT"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AccelError::ManifestNotFound(PathBuf::from("/tmp/project/package.json"));
        assert!(err.to_string().contains("Missing package.json"));
        assert!(err.to_string().contains("/tmp/project/package.json"));
    }

    #[test]
    fn installer_execution_display_includes_exit_code() {
        let err = AccelError::installer_exec("npm install --production=false", Some(1), "E404");
        let message = err.to_string();
        assert!(message.contains("exit code: 1"));
        assert!(message.contains("E404"));

        let signaled = AccelError::installer_exec("yarn", None, "");
        assert!(signaled.to_string().contains("exit code: none"));
    }

    #[test]
    fn error_phase() {
        assert_eq!(
            AccelError::ManifestNotFound(PathBuf::new()).phase(),
            "manifest lookup"
        );
        assert_eq!(AccelError::NodeInterpreterNotFound.phase(), "installer resolution");
        assert_eq!(
            AccelError::installer_exec("npm", Some(2), "").phase(),
            "installer execution"
        );
        let extraction = AccelError::CacheExtraction {
            key: "abc".to_string(),
            source: std::io::Error::other("truncated"),
        };
        assert_eq!(extraction.phase(), "cache extraction");
    }

    #[test]
    fn error_hint() {
        let err = AccelError::CacheExtraction {
            key: "abc".to_string(),
            source: std::io::Error::other("truncated"),
        };
        assert!(err.hint().unwrap().contains("--update"));
        assert_eq!(AccelError::Internal("x".to_string()).hint(), None);
    }
}
