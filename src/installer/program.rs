//! External installer programs
//!
//! Implements the Installer trait by running npm, yarn, pnpm or npm-cache
//! as a child process in the project directory.

use crate::error::{AccelError, AccelResult};
use crate::installer::{Installer, InstallerIdentity, InstallerKind};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Node.js interpreter names; Debian ships it as `nodejs`
const NODE_INTERPRETERS: &[&str] = &["nodejs", "node"];

/// Number of trailing stderr lines kept in installer errors
const STDERR_EXCERPT_LINES: usize = 20;

/// Find an executable by name on a `PATH`-style search path
pub fn find_program(name: &str, search_path: Option<&OsString>) -> Option<PathBuf> {
    let search_path = match search_path {
        Some(path) => path.clone(),
        None => std::env::var_os("PATH")?,
    };

    std::env::split_paths(&search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Keep the last few lines of installer stderr
fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_EXCERPT_LINES);
    lines[start..].join("\n")
}

/// Installer backed by an external program
#[derive(Debug, Clone)]
pub struct ProgramInstaller {
    kind: InstallerKind,
    search_path: Option<OsString>,
}

impl ProgramInstaller {
    /// Create an installer that searches the process `PATH`
    pub fn new(kind: InstallerKind) -> Self {
        Self {
            kind,
            search_path: None,
        }
    }

    /// Search an explicit `PATH`-style value instead of the process `PATH`
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Path of the installer binary
    pub fn binary(&self) -> AccelResult<PathBuf> {
        find_program(self.kind.program(), self.search_path.as_ref()).ok_or_else(|| {
            AccelError::InstallerNotFound {
                name: self.kind.program().to_string(),
            }
        })
    }

    fn node_interpreter(&self) -> AccelResult<PathBuf> {
        NODE_INTERPRETERS
            .iter()
            .find_map(|name| {
                debug!("Checking availability of program: {}", name);
                find_program(name, self.search_path.as_ref())
            })
            .ok_or(AccelError::NodeInterpreterNotFound)
    }

    /// Capture `<program> --version`, run from `cwd`
    async fn version(&self, program: &Path, cwd: &Path) -> AccelResult<String> {
        let output = Command::new(program)
            .arg("--version")
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AccelError::InstallerVersion {
                program: program.display().to_string(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(AccelError::InstallerVersion {
                program: program.display().to_string(),
                reason: stderr_excerpt(&output.stderr),
            })
        }
    }
}

#[async_trait]
impl Installer for ProgramInstaller {
    fn kind(&self) -> InstallerKind {
        self.kind
    }

    async fn resolve_identity(&self, project_dir: &Path) -> AccelResult<InstallerIdentity> {
        let binary = self.binary()?;
        let version = self.version(&binary, project_dir).await?;

        let node = self.node_interpreter()?;
        let node_version = self.version(&node, project_dir).await?;

        debug!(
            "Resolved {} {} at {} (Node.js {})",
            self.kind,
            version,
            binary.display(),
            node_version
        );

        Ok(InstallerIdentity {
            kind: self.kind,
            binary,
            version,
            node_version,
        })
    }

    async fn install(&self, project_dir: &Path, production: bool) -> AccelResult<()> {
        let binary = self.binary()?;
        let args = self.kind.install_args(production);
        let command_line = format!("{} {}", self.kind.program(), args.join(" "));

        info!("Running command: {}", command_line);

        let output = Command::new(&binary)
            .args(&args)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AccelError::InstallerSpawn {
                command: command_line.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!("{}: {}", self.kind, line);
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(AccelError::installer_exec(
                command_line,
                output.status.code(),
                stderr_excerpt(&output.stderr),
            ))
        }
    }
}
