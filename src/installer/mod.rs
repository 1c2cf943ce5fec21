//! Installer abstraction
//!
//! An installer populates `node_modules` for a project directory. The
//! accelerator only talks to the [`Installer`] trait; [`ProgramInstaller`]
//! drives the real npm/yarn/pnpm/npm-cache programs.

mod factory;
mod kind;
mod program;

pub use factory::select_installer;
pub use kind::{InstallerKind, InstallerSelection};
pub use program::{find_program, ProgramInstaller};

use crate::error::AccelResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Resolved installer toolchain, bound into every cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerIdentity {
    /// Which installer
    pub kind: InstallerKind,
    /// Absolute path of the resolved installer binary
    pub binary: PathBuf,
    /// Output of `<installer> --version`
    pub version: String,
    /// Output of `node --version`
    pub node_version: String,
}

impl InstallerIdentity {
    /// Stable string form fed into the cache key
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|node={}",
            self.kind,
            self.binary.display(),
            self.version,
            self.node_version
        )
    }
}

/// Abstract installer interface
#[async_trait]
pub trait Installer: Send + Sync {
    /// Which installer this is
    fn kind(&self) -> InstallerKind;

    /// Resolve the binary and versions that will install `project_dir`
    ///
    /// Version managers (corepack, yarnPath) pick the version per project,
    /// so the versions are queried from inside `project_dir`.
    async fn resolve_identity(&self, project_dir: &Path) -> AccelResult<InstallerIdentity>;

    /// Populate `<project_dir>/node_modules`
    async fn install(&self, project_dir: &Path, production: bool) -> AccelResult<()>;
}
