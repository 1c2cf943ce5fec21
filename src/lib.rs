//! npm-accel - Accelerator for npm, the Node.js package manager
//!
//! Archives fully populated `node_modules` directories in a local cache,
//! keyed by a fingerprint of `package.json`, the lockfile and the installer
//! toolchain, and restores them instead of re-running the installer.

pub mod accelerator;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod installer;
pub mod ui;

pub use accelerator::{Accelerator, InstallReport, InstallRequest};
pub use error::{AccelError, AccelResult};
