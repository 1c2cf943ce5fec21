//! CLI command implementations

pub mod benchmark;
pub mod install;

pub use benchmark::execute as benchmark;
pub use install::execute as install;

use crate::error::{AccelError, AccelResult};
use std::path::{Path, PathBuf};

/// Absolute project directory from the positional argument
pub(crate) fn project_dir(directory: Option<&Path>) -> AccelResult<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| AccelError::io("getting current directory", e))?;
    Ok(match directory {
        Some(dir) => cwd.join(dir),
        None => cwd,
    })
}

/// Short human-readable duration
pub(crate) fn format_duration(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{}m {:02}s", elapsed.as_secs() / 60, elapsed.as_secs() % 60)
    }
}
