//! Persistent cache of `node_modules` directories
//!
//! Each cache entry is a tar archive of a fully populated `node_modules`
//! directory, keyed by a fingerprint of everything that determines its
//! contents.
//!
//! # Cache Key Inputs
//!
//! | Input | Source |
//! |-------|--------|
//! | Manifest | raw bytes of `package.json` |
//! | Lockfile | raw bytes of the installer's lockfile, if any |
//! | Toolchain | installer binary path, installer version, Node.js version |
//! | Mode | production-only flag |
//!
//! # Entry Lifecycle
//!
//! | Event | Effect |
//! |-------|--------|
//! | Install succeeds | archive written to temp file, renamed to `<key>.tar` |
//! | Cache hit | archive unpacked, mtime refreshed |
//! | Over limit after a write | oldest-mtime archives deleted |

pub mod archive;
pub mod key;
pub mod lockfile;
pub mod store;

pub use key::{compute_key, CacheKey};
pub use lockfile::{
    detect_lockfile, read_project, require_manifest, LockfileInfo, ProjectFiles, MANIFEST_FILE,
    MODULES_DIR,
};
pub use store::{CacheEntry, CacheStore};
