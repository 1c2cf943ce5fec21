//! Manifest and lockfile discovery
//!
//! Reads the raw bytes that go into the cache key. Contents are never
//! parsed; a byte change anywhere means a different cache entry.

use crate::error::{AccelError, AccelResult};
use crate::installer::InstallerKind;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the dependency manifest
pub const MANIFEST_FILE: &str = "package.json";

/// Name of the dependency directory populated by installers
pub const MODULES_DIR: &str = "node_modules";

/// A lockfile found next to the manifest
#[derive(Debug, Clone)]
pub struct LockfileInfo {
    /// Path to the lockfile
    pub path: PathBuf,
    /// Raw lockfile contents
    pub contents: Vec<u8>,
}

/// Fingerprint inputs read from a project directory
#[derive(Debug, Clone)]
pub struct ProjectFiles {
    /// Path to package.json
    pub manifest_path: PathBuf,
    /// Raw package.json contents
    pub manifest: Vec<u8>,
    /// The installer's lockfile, if present
    pub lockfile: Option<LockfileInfo>,
}

impl ProjectFiles {
    /// Lockfile contents, if a lockfile was found
    pub fn lockfile_contents(&self) -> Option<&[u8]> {
        self.lockfile.as_ref().map(|l| l.contents.as_slice())
    }
}

fn read_file(path: &Path, what: &str) -> AccelResult<Vec<u8>> {
    fs::read(path).map_err(|e| AccelError::io(format!("reading {} {}", what, path.display()), e))
}

/// Detect the lockfile the given installer would use
pub fn detect_lockfile(
    project_dir: &Path,
    kind: InstallerKind,
) -> AccelResult<Option<LockfileInfo>> {
    for pattern in kind.lockfile_patterns() {
        let lockfile_path = project_dir.join(pattern);
        if lockfile_path.is_file() {
            debug!("Found {} lockfile: {}", kind, lockfile_path.display());
            let contents = read_file(&lockfile_path, "lockfile")?;
            return Ok(Some(LockfileInfo {
                path: lockfile_path,
                contents,
            }));
        }
    }

    debug!("No {} lockfile in {}", kind, project_dir.display());
    Ok(None)
}

/// Path of the project's package.json, which must exist
pub fn require_manifest(project_dir: &Path) -> AccelResult<PathBuf> {
    let manifest_path = project_dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(AccelError::ManifestNotFound(manifest_path));
    }
    Ok(manifest_path)
}

/// Read the manifest and lockfile of a project
///
/// Fails with [`AccelError::ManifestNotFound`] when package.json is missing.
pub fn read_project(project_dir: &Path, kind: InstallerKind) -> AccelResult<ProjectFiles> {
    let manifest_path = require_manifest(project_dir)?;
    let manifest = read_file(&manifest_path, "manifest")?;
    let lockfile = detect_lockfile(project_dir, kind)?;

    Ok(ProjectFiles {
        manifest_path,
        manifest,
        lockfile,
    })
}
