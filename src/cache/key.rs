//! Cache key (fingerprint) computation
//!
//! A cache key is the SHA256 digest of everything that determines the
//! contents of a populated `node_modules` directory: the manifest bytes,
//! the lock file bytes (if any), the installer toolchain identity and the
//! production-only flag.

use sha2::{Digest, Sha256};
use std::fmt;

/// Bumped whenever the byte layout fed into the digest changes
const KEY_DOMAIN: &[u8] = b"npm-accel/cache-key/v1";

/// Length of a cache key in hex characters
pub const KEY_LENGTH: usize = 64;

/// Opaque, fixed-length cache key (lowercase hex SHA256)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Parse a key from its hex representation (e.g. an archive file stem)
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == KEY_LENGTH
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(s.to_string()))
    }

    /// The key as a hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Feed one length-prefixed field into the digest.
///
/// The length prefix keeps field boundaries unambiguous, so moving bytes
/// from one field to the next always changes the key.
fn update_field(hasher: &mut Sha256, tag: &[u8], value: &[u8]) {
    hasher.update(tag);
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value);
}

/// Compute the cache key for one installation.
///
/// Pure function: no I/O, no clock, no environment. `installer_identity`
/// must come from [`InstallerIdentity::fingerprint`] so that the resolved
/// binary and its version are bound into the key, not just the installer
/// name.
///
/// [`InstallerIdentity::fingerprint`]: crate::installer::InstallerIdentity::fingerprint
pub fn compute_key(
    manifest: &[u8],
    lockfile: Option<&[u8]>,
    installer_identity: &str,
    production: bool,
) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DOMAIN);

    update_field(&mut hasher, b"manifest", manifest);

    // An absent lock file must not hash like an empty one
    match lockfile {
        Some(contents) => update_field(&mut hasher, b"lockfile", contents),
        None => hasher.update(b"no-lockfile"),
    }

    update_field(&mut hasher, b"installer", installer_identity.as_bytes());
    update_field(&mut hasher, b"production", &[u8::from(production)]);

    CacheKey(hex::encode(hasher.finalize()))
}
