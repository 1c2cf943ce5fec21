//! On-disk cache of `node_modules` archives
//!
//! Layout: one `<key>.tar` file per entry directly under the cache
//! directory, nothing else. The archive's mtime is the entry's last-use
//! time and the only input to eviction.
//!
//! Archives are written to a `.partial` temporary file in the cache
//! directory and renamed into place, so readers in other processes see
//! either no entry or a complete one.

use crate::cache::archive::{pack_directory, unpack_archive};
use crate::cache::key::CacheKey;
use crate::error::{AccelError, AccelResult};
use filetime::FileTime;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Archive file extension
pub const ARCHIVE_EXTENSION: &str = "tar";

/// Suffix of in-progress archives
const PARTIAL_SUFFIX: &str = ".partial";

/// Partial archives older than this can only belong to killed writers
const STALE_PARTIAL_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// One archived `node_modules` directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Cache key
    pub key: CacheKey,
    /// Path of the archive
    pub path: PathBuf,
    /// Last time the entry was written or used
    pub last_used: SystemTime,
    /// Archive size in bytes
    pub size_bytes: u64,
}

/// Cache directory of `node_modules` archives
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root` (created lazily on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the archive for `key`
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.{}", key, ARCHIVE_EXTENSION))
    }

    /// Whether an archive exists for `key` (no content validation)
    pub fn has_entry(&self, key: &CacheKey) -> bool {
        self.entry_path(key).is_file()
    }

    /// Replace `destination` with the contents of the archive for `key`.
    ///
    /// The archive is unpacked into a staging directory next to
    /// `destination` and renamed into place, so a failed extraction leaves
    /// no half-populated dependency directory behind.
    pub fn extract(&self, key: &CacheKey, destination: &Path) -> AccelResult<()> {
        let path = self.entry_path(key);
        info!(key = %key, path = %path.display(), "Installing from cache");

        let extraction_error = |source: io::Error| AccelError::CacheExtraction {
            key: key.to_string(),
            source,
        };

        let file = fs::File::open(&path).map_err(extraction_error)?;
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let staging = tempfile::Builder::new()
            .prefix(".npm-accel-extract-")
            .tempdir_in(parent)
            .map_err(extraction_error)?;

        unpack_archive(BufReader::new(file), staging.path()).map_err(extraction_error)?;

        // tempdir is created 0700; the archive carries no entry for the root itself
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staging.path(), fs::Permissions::from_mode(0o755))
                .map_err(extraction_error)?;
        }

        remove_path(destination).map_err(extraction_error)?;
        fs::rename(staging.path(), destination).map_err(extraction_error)?;

        debug!(key = %key, destination = %destination.display(), "Unpacked archive");
        Ok(())
    }

    /// Archive the contents of `source` as the entry for `key`.
    ///
    /// Replaces any existing entry atomically. An interrupted store leaves
    /// at most a `.partial` file, never a file at the entry path.
    pub fn store(&self, key: &CacheKey, source: &Path) -> AccelResult<()> {
        let path = self.entry_path(key);
        info!(key = %key, path = %path.display(), "Adding to cache");

        let write_error = |source: io::Error| AccelError::CacheWrite {
            key: key.to_string(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(write_error)?;

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{}.{}.", key, ARCHIVE_EXTENSION))
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&self.root)
            .map_err(write_error)?;

        let mut writer = pack_directory(source, BufWriter::new(temp)).map_err(write_error)?;
        writer.flush().map_err(write_error)?;
        let temp = writer
            .into_inner()
            .map_err(|e| write_error(e.into_error()))?;
        temp.as_file().sync_all().map_err(write_error)?;

        temp.persist(&path).map_err(|e| write_error(e.error))?;

        debug!(key = %key, "Archive renamed into place");
        Ok(())
    }

    /// Mark the entry for `key` as just used
    pub fn touch(&self, key: &CacheKey) -> AccelResult<()> {
        filetime::set_file_mtime(self.entry_path(key), FileTime::now()).map_err(|e| {
            AccelError::CacheWrite {
                key: key.to_string(),
                source: e,
            }
        })
    }

    /// All entries in the cache directory, in no particular order.
    ///
    /// Files that are not named `<key>.tar` are ignored.
    pub fn entries(&self) -> AccelResult<Vec<CacheEntry>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AccelError::io(
                    format!("reading cache directory {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut entries = Vec::new();
        for dir_entry in dir.flatten() {
            let file_name = dir_entry.file_name();
            let Some(key) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(".tar"))
                .and_then(CacheKey::parse)
            else {
                continue;
            };

            // Entry may vanish under a concurrent eviction
            let Ok(metadata) = dir_entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            entries.push(CacheEntry {
                key,
                path: dir_entry.path(),
                last_used: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                size_bytes: metadata.len(),
            });
        }

        Ok(entries)
    }

    /// Delete least-recently-used entries until at most `limit` remain.
    ///
    /// Ties on last-use time are broken by key. Returns the removed entries.
    pub fn evict_excess(&self, limit: usize) -> AccelResult<Vec<CacheEntry>> {
        self.remove_stale_partials();

        let mut entries = self.entries()?;
        if entries.len() <= limit {
            debug!(
                entries = entries.len(),
                limit, "Cache within limit, nothing to evict"
            );
            return Ok(Vec::new());
        }

        entries.sort_by(|a, b| a.last_used.cmp(&b.last_used).then_with(|| a.key.cmp(&b.key)));
        let excess = entries.len() - limit;
        let removed: Vec<CacheEntry> = entries.into_iter().take(excess).collect();

        for entry in &removed {
            debug!(key = %entry.key, "Removing archive from cache");
            match fs::remove_file(&entry.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AccelError::io(
                        format!("removing cache entry {}", entry.path.display()),
                        e,
                    ))
                }
            }
        }

        info!(removed = removed.len(), limit, "Evicted least recently used archives");
        Ok(removed)
    }

    /// Remove `.partial` files left behind by killed writers
    fn remove_stale_partials(&self) {
        let Ok(dir) = fs::read_dir(&self.root) else {
            return;
        };
        let now = SystemTime::now();

        for dir_entry in dir.flatten() {
            let is_partial = dir_entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX));
            if !is_partial {
                continue;
            }

            let stale = dir_entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > STALE_PARTIAL_AGE);
            if stale {
                let path = dir_entry.path();
                if let Err(e) = fs::remove_file(&path) {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to remove stale partial archive"
                    );
                } else {
                    debug!(path = %path.display(), "Removed stale partial archive");
                }
            }
        }
    }
}

/// Remove a file, symlink or directory tree if it exists
pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::archive::tests::{populate_modules, snapshot};
    use crate::cache::key::compute_key;
    use tempfile::TempDir;

    fn key(n: u32) -> CacheKey {
        compute_key(format!("manifest {}", n).as_bytes(), None, "npm|/usr/bin/npm|10", false)
    }

    fn set_age(path: &Path, age_secs: u64) {
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        filetime::set_file_mtime(path, FileTime::from_system_time(mtime)).unwrap();
    }

    #[test]
    fn entry_path_is_key_dot_tar() {
        let store = CacheStore::new("/var/cache/npm-accel");
        let k = key(1);
        assert_eq!(
            store.entry_path(&k),
            PathBuf::from(format!("/var/cache/npm-accel/{}.tar", k))
        );
    }

    #[test]
    fn store_then_extract_round_trip() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let modules = project.path().join("node_modules");
        fs::create_dir(&modules).unwrap();
        populate_modules(&modules);

        let store = CacheStore::new(cache.path().join("nested/cache"));
        let k = key(1);
        assert!(!store.has_entry(&k));

        store.store(&k, &modules).unwrap();
        assert!(store.has_entry(&k));

        let other = TempDir::new().unwrap();
        let destination = other.path().join("node_modules");
        store.extract(&k, &destination).unwrap();

        assert_eq!(snapshot(&modules), snapshot(&destination));
    }

    #[test]
    fn extract_replaces_existing_directory() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let modules = project.path().join("node_modules");
        fs::create_dir(&modules).unwrap();
        populate_modules(&modules);

        let store = CacheStore::new(cache.path());
        let k = key(2);
        store.store(&k, &modules).unwrap();

        fs::write(modules.join("stale.js"), "old").unwrap();
        store.extract(&k, &modules).unwrap();

        assert!(!modules.join("stale.js").exists());
        assert!(modules.join("left-pad/package.json").is_file());
    }

    #[test]
    fn extract_corrupt_archive_fails_and_keeps_destination() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let modules = project.path().join("node_modules");
        fs::create_dir(&modules).unwrap();
        fs::write(modules.join("keep.js"), "keep").unwrap();

        let store = CacheStore::new(cache.path());
        let k = key(3);
        fs::write(store.entry_path(&k), vec![0x5a_u8; 4096]).unwrap();
        assert!(store.has_entry(&k));

        let err = store.extract(&k, &modules).unwrap_err();
        assert!(matches!(err, AccelError::CacheExtraction { .. }));
        assert!(modules.join("keep.js").is_file());

        let leftovers: Vec<_> = fs::read_dir(project.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name() != "node_modules")
            .collect();
        assert!(leftovers.is_empty(), "staging directory left behind");
    }

    #[test]
    fn extract_missing_entry_fails() {
        let cache = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());

        let err = store
            .extract(&key(4), &project.path().join("node_modules"))
            .unwrap_err();
        assert!(matches!(err, AccelError::CacheExtraction { .. }));
    }

    #[test]
    fn interrupted_store_is_not_an_entry() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let k = key(5);

        // What a writer killed before the rename leaves behind
        let partial = cache
            .path()
            .join(format!(".{}.tar.Ab12Cd{}", k, PARTIAL_SUFFIX));
        fs::write(&partial, b"truncated").unwrap();

        assert!(!store.has_entry(&k));
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn store_failure_leaves_no_entry() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let k = key(6);

        let err = store.store(&k, &cache.path().join("missing")).unwrap_err();
        assert!(matches!(err, AccelError::CacheWrite { .. }));
        assert!(!store.has_entry(&k));
        assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn store_failing_midway_leaves_no_entry() {
        let cache = TempDir::new().unwrap();
        let modules = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let k = key(9);

        // Entries are packed in name order, so the socket fails after the packages
        populate_modules(modules.path());
        let _socket = std::os::unix::net::UnixListener::bind(modules.path().join("zz.sock"))
            .unwrap();

        let err = store.store(&k, modules.path()).unwrap_err();
        assert!(matches!(err, AccelError::CacheWrite { .. }));
        assert!(!store.has_entry(&k));
        assert!(store.entries().unwrap().is_empty());
        assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn failed_replacement_keeps_previous_entry() {
        let cache = TempDir::new().unwrap();
        let good = TempDir::new().unwrap();
        let broken = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let k = key(10);

        populate_modules(good.path());
        store.store(&k, good.path()).unwrap();

        populate_modules(broken.path());
        let _socket = std::os::unix::net::UnixListener::bind(broken.path().join("zz.sock"))
            .unwrap();
        store.store(&k, broken.path()).unwrap_err();

        let project = TempDir::new().unwrap();
        let destination = project.path().join("node_modules");
        store.extract(&k, &destination).unwrap();
        assert_eq!(snapshot(&destination), snapshot(good.path()));
        assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 1);
    }

    #[test]
    fn empty_directory_is_a_valid_entry() {
        let cache = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let k = key(7);

        store.store(&k, empty.path()).unwrap();
        assert!(store.has_entry(&k));

        let project = TempDir::new().unwrap();
        let destination = project.path().join("node_modules");
        store.extract(&k, &destination).unwrap();
        assert!(destination.is_dir());
        assert_eq!(fs::read_dir(&destination).unwrap().count(), 0);
    }

    #[test]
    fn entries_ignore_foreign_files() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let k = key(8);
        fs::write(store.entry_path(&k), b"").unwrap();
        fs::write(cache.path().join("README"), b"").unwrap();
        fs::write(cache.path().join("abc.tar"), b"").unwrap();
        fs::write(cache.path().join(format!("{}.json", k)), b"{}").unwrap();

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, k);
    }

    #[test]
    fn entries_of_missing_directory_is_empty() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path().join("does-not-exist"));
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn touch_refreshes_last_used() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let k = key(9);
        let path = store.entry_path(&k);
        fs::write(&path, b"").unwrap();
        set_age(&path, 3600);

        let before = store.entries().unwrap()[0].last_used;
        store.touch(&k).unwrap();
        let after = store.entries().unwrap()[0].last_used;

        assert!(after > before);
    }

    #[test]
    fn evict_keeps_most_recently_used() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let limit = 4;

        // limit + 3 entries, entry i used i minutes after entry 0
        let keys: Vec<CacheKey> = (0..limit as u32 + 3).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            let path = store.entry_path(k);
            fs::write(&path, b"").unwrap();
            set_age(&path, 10_000 - 60 * i as u64);
        }

        let removed = store.evict_excess(limit).unwrap();
        let removed_keys: Vec<_> = removed.iter().map(|e| e.key.clone()).collect();
        assert_eq!(removed_keys, keys[..3].to_vec());

        let mut remaining: Vec<_> = store.entries().unwrap().into_iter().map(|e| e.key).collect();
        remaining.sort();
        let mut expected = keys[3..].to_vec();
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[test]
    fn evict_ties_break_by_key() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let mtime = FileTime::from_unix_time(1_700_000_000, 0);

        let mut keys: Vec<CacheKey> = (10..13).map(key).collect();
        for k in &keys {
            let path = store.entry_path(k);
            fs::write(&path, b"").unwrap();
            filetime::set_file_mtime(&path, mtime).unwrap();
        }
        keys.sort();

        let removed = store.evict_excess(1).unwrap();
        let removed_keys: Vec<_> = removed.into_iter().map(|e| e.key).collect();
        assert_eq!(removed_keys, keys[..2].to_vec());
        assert!(store.has_entry(&keys[2]));
    }

    #[test]
    fn evict_within_limit_is_noop() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        for n in 0..3 {
            fs::write(store.entry_path(&key(n)), b"").unwrap();
        }

        assert!(store.evict_excess(3).unwrap().is_empty());
        assert_eq!(store.entries().unwrap().len(), 3);
    }

    #[test]
    fn evict_removes_only_stale_partials() {
        let cache = TempDir::new().unwrap();
        let store = CacheStore::new(cache.path());
        let k = key(20);

        let stale = cache.path().join(format!(".{}.tar.old{}", k, PARTIAL_SUFFIX));
        let fresh = cache.path().join(format!(".{}.tar.new{}", k, PARTIAL_SUFFIX));
        fs::write(&stale, b"").unwrap();
        fs::write(&fresh, b"").unwrap();
        set_age(&stale, STALE_PARTIAL_AGE.as_secs() + 60);

        store.evict_excess(20).unwrap();

        assert!(!stale.exists());
        assert!(fresh.exists());
    }
}
