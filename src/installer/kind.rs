//! Supported Node.js installers

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported installers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallerKind {
    /// npm (package-lock.json, npm-shrinkwrap.json)
    Npm,
    /// Yarn (yarn.lock)
    Yarn,
    /// pnpm (pnpm-lock.yaml)
    Pnpm,
    /// npm-cache wrapper around npm (keeps its own cache)
    #[value(name = "npm-cache")]
    NpmCache,
}

impl InstallerKind {
    /// Installers tried, in order, when none is configured
    pub const PREFERENCE: &'static [Self] = &[Self::Yarn, Self::Npm];

    /// Every supported installer
    pub fn all() -> &'static [Self] {
        &[Self::Npm, Self::Yarn, Self::Pnpm, Self::NpmCache]
    }

    /// Name of the program on the search path
    pub fn program(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::NpmCache => "npm-cache",
        }
    }

    /// Arguments that populate `node_modules` in the working directory
    pub fn install_args(&self, production: bool) -> Vec<String> {
        let production = format!("--production={}", production);
        match self {
            Self::Npm | Self::Pnpm => vec!["install".to_string(), production],
            Self::Yarn => vec![production],
            Self::NpmCache => vec!["install".to_string(), "npm".to_string(), production],
        }
    }

    /// Lock file names, most specific first
    pub fn lockfile_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Npm | Self::NpmCache => &["npm-shrinkwrap.json", "package-lock.json"],
            Self::Yarn => &["yarn.lock"],
            Self::Pnpm => &["pnpm-lock.yaml"],
        }
    }

    /// Whether the installer keeps a `node_modules` cache of its own.
    ///
    /// Archiving on top of such an installer would just duplicate its cache,
    /// so reads and writes of ours are disabled for it.
    pub fn manages_own_cache(&self) -> bool {
        matches!(self, Self::NpmCache)
    }
}

impl fmt::Display for InstallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// How the installer is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallerSelection {
    /// First available installer from [`InstallerKind::PREFERENCE`]
    #[default]
    Auto,
    /// Exactly this installer, failing if it is not available
    Explicit(InstallerKind),
}

impl From<Option<InstallerKind>> for InstallerSelection {
    fn from(kind: Option<InstallerKind>) -> Self {
        kind.map_or(Self::Auto, Self::Explicit)
    }
}
