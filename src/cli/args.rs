//! CLI argument definitions using clap derive

use crate::config::Overrides;
use crate::installer::InstallerKind;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// npm-accel - Accelerator for npm, the Node.js package manager
///
/// Installs the dependencies of a Node.js project, reusing a previously
/// archived node_modules directory when package.json, the lockfile and
/// the installer toolchain are unchanged.
#[derive(Parser, Debug)]
#[command(name = "npm-accel")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Project directory containing package.json (defaults to current directory)
    #[arg(value_name = "DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Don't install devDependencies
    #[arg(short, long)]
    pub production: bool,

    /// Installer to use instead of auto-detection
    #[arg(short, long, value_enum)]
    pub installer: Option<InstallerKind>,

    /// Directory where cache archives are stored
    #[arg(short = 'c', long, value_name = "DIR")]
    pub cache_directory: Option<PathBuf>,

    /// Maximum number of archives to keep in the cache (default 20)
    #[arg(short = 'l', long, value_name = "COUNT")]
    pub cache_limit: Option<String>,

    /// Don't add node_modules to the cache after installing
    #[arg(short, long)]
    pub no_cache: bool,

    /// Ignore an existing cache entry and rebuild it
    #[arg(short, long)]
    pub update: bool,

    /// Compare the available installers against npm-accel
    #[arg(short, long)]
    pub benchmark: bool,

    /// Rounds per approach when benchmarking
    #[arg(
        long,
        value_name = "N",
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub iterations: u32,

    /// Configuration file path
    #[arg(long, env = "NPM_ACCEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Decrease verbosity (errors only)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    /// Settings given on the command line
    pub fn overrides(&self) -> Overrides {
        Overrides {
            cache_directory: self.cache_directory.clone(),
            cache_limit: self.cache_limit.clone(),
            production: self.production,
            installer: self.installer,
        }
    }
}
