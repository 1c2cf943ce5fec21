//! Install orchestration
//!
//! One [`Accelerator::install`] call runs the whole pipeline for a project:
//!
//! ```text
//! Start -> KeyComputed -> CacheHit ----------------------------> Done
//!                      \-> CacheMiss -> Installing -> Archiving -> Done
//! ```
//!
//! Any unrecovered error ends the pipeline. A failure to archive after a
//! successful install is reported in the [`InstallReport`] instead.

use crate::cache::store::remove_path;
use crate::cache::{compute_key, read_project, CacheKey, CacheStore, ProjectFiles, MODULES_DIR};
use crate::error::{AccelError, AccelResult};
use crate::installer::Installer;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default maximum number of archives kept in the cache
pub const DEFAULT_CACHE_LIMIT: usize = 20;

/// Pipeline stage, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    KeyComputed,
    CacheHit,
    CacheMiss,
    Installing,
    Archiving,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::KeyComputed => "key-computed",
            Self::CacheHit => "cache-hit",
            Self::CacheMiss => "cache-miss",
            Self::Installing => "installing",
            Self::Archiving => "archiving",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// One installation request
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Directory containing package.json
    pub project_dir: PathBuf,
    /// Skip devDependencies
    pub production: bool,
    /// Never write to the cache
    pub no_cache: bool,
    /// Ignore an existing cache entry and rebuild it
    pub update: bool,
}

impl InstallRequest {
    /// Request with default flags for `project_dir`
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            production: false,
            no_cache: false,
            update: false,
        }
    }
}

/// Where the installed `node_modules` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallSource {
    /// Unpacked from a cache archive
    Cache,
    /// Produced by running the installer
    Installer,
}

/// What happened to the cache after the install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
    /// New archive stored under the key
    Stored,
    /// Served from the cache, nothing to write
    Unchanged,
    /// Writing was disabled (`--no-cache` or an installer with its own cache)
    Disabled,
    /// Archiving failed; the install itself succeeded
    Failed(String),
}

/// Result of a successful install
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Cache key of the project
    pub key: CacheKey,
    /// Where node_modules came from
    pub source: InstallSource,
    /// Cache write outcome
    pub cache_write: CacheWrite,
    /// Number of archives evicted afterwards
    pub evicted: usize,
    /// Wall-clock duration of the install
    pub elapsed: Duration,
}

/// Composes fingerprinting, the cache store and an installer
pub struct Accelerator {
    store: CacheStore,
    cache_limit: usize,
    installer: Box<dyn Installer>,
}

impl Accelerator {
    /// Create an accelerator
    pub fn new(store: CacheStore, cache_limit: usize, installer: Box<dyn Installer>) -> Self {
        Self {
            store,
            cache_limit,
            installer,
        }
    }

    /// The cache store in use
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// The installer in use
    pub fn installer(&self) -> &dyn Installer {
        self.installer.as_ref()
    }

    /// Populate `<project_dir>/node_modules`, from the cache when possible
    pub async fn install(&self, request: &InstallRequest) -> AccelResult<InstallReport> {
        let started = Instant::now();
        let kind = self.installer.kind();
        enter(Stage::Start, &request.project_dir);

        let files = read_project(&request.project_dir, kind)?;
        let identity = self.installer.resolve_identity(&request.project_dir).await?;
        let key = compute_key(
            &files.manifest,
            files.lockfile_contents(),
            &identity.fingerprint(),
            request.production,
        );
        enter(Stage::KeyComputed, &request.project_dir);
        debug!(
            key = %key,
            installer = %identity.fingerprint(),
            production = request.production,
            "Computed cache key"
        );

        let modules_dir = request.project_dir.join(MODULES_DIR);
        let read_allowed = !request.update && !kind.manages_own_cache();
        let write_allowed = !request.no_cache && !kind.manages_own_cache();

        if request.update {
            info!(key = %key, "Update requested, ignoring any existing cache entry");
        }

        if read_allowed && self.store.has_entry(&key) {
            enter(Stage::CacheHit, &request.project_dir);

            let store = self.store.clone();
            let hit_key = key.clone();
            let destination = modules_dir.clone();
            blocking(move || store.extract(&hit_key, &destination)).await?;

            if let Err(e) = self.store.touch(&key) {
                warn!(key = %key, error = %e, "Failed to refresh last-used time of cache entry");
            }

            enter(Stage::Done, &request.project_dir);
            return Ok(InstallReport {
                key,
                source: InstallSource::Cache,
                cache_write: CacheWrite::Unchanged,
                evicted: 0,
                elapsed: started.elapsed(),
            });
        }

        enter(Stage::CacheMiss, &request.project_dir);
        reset_directory(&modules_dir)?;

        enter(Stage::Installing, &request.project_dir);
        let installed = self
            .installer
            .install(&request.project_dir, request.production)
            .await;
        restore_manifest(&files)?;
        installed?;

        let (cache_write, evicted) = if write_allowed {
            enter(Stage::Archiving, &request.project_dir);
            self.archive(&key, &modules_dir).await
        } else {
            debug!(key = %key, "Cache writes disabled, not archiving");
            (CacheWrite::Disabled, 0)
        };

        enter(Stage::Done, &request.project_dir);
        Ok(InstallReport {
            key,
            source: InstallSource::Installer,
            cache_write,
            evicted,
            elapsed: started.elapsed(),
        })
    }

    /// Store the archive and trim the cache; failures only warn
    async fn archive(&self, key: &CacheKey, modules_dir: &Path) -> (CacheWrite, usize) {
        let store = self.store.clone();
        let store_key = key.clone();
        let source = modules_dir.to_path_buf();

        if let Err(e) = blocking(move || store.store(&store_key, &source)).await {
            warn!(key = %key, phase = e.phase(), error = %e, "Failed to add node_modules to cache");
            return (CacheWrite::Failed(e.to_string()), 0);
        }

        let evicted = match self.store.evict_excess(self.cache_limit) {
            Ok(removed) => removed.len(),
            Err(e) => {
                warn!(error = %e, "Failed to evict old cache entries");
                0
            }
        };

        (CacheWrite::Stored, evicted)
    }
}

fn enter(stage: Stage, project_dir: &Path) {
    debug!(stage = %stage, project = %project_dir.display(), "Install stage");
}

/// Run blocking filesystem work off the async worker threads
async fn blocking<T, F>(f: F) -> AccelResult<T>
where
    F: FnOnce() -> AccelResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AccelError::Internal(format!("blocking task failed: {}", e)))?
}

/// Make sure `dir` exists and is empty
fn reset_directory(dir: &Path) -> AccelResult<()> {
    if dir.exists() {
        debug!("Clearing directory contents ({})", dir.display());
    } else {
        debug!("Creating directory ({})", dir.display());
    }
    remove_path(dir).map_err(|e| AccelError::io(format!("clearing {}", dir.display()), e))?;
    fs::create_dir_all(dir).map_err(|e| AccelError::io(format!("creating {}", dir.display()), e))
}

/// Put package.json back the way it was if the installer rewrote it
fn restore_manifest(files: &ProjectFiles) -> AccelResult<()> {
    let current = fs::read(&files.manifest_path).ok();
    if current.as_deref() == Some(files.manifest.as_slice()) {
        return Ok(());
    }

    debug!("Restoring contents of {}", files.manifest_path.display());
    fs::write(&files.manifest_path, &files.manifest).map_err(|e| {
        AccelError::io(format!("restoring {}", files.manifest_path.display()), e)
    })
}
