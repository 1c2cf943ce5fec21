//! Installer selection
//!
//! Resolves the configured [`InstallerSelection`] to a concrete installer.

use crate::error::{AccelError, AccelResult};
use crate::installer::program::{find_program, ProgramInstaller};
use crate::installer::{InstallerKind, InstallerSelection};
use std::ffi::OsString;
use tracing::debug;

/// Pick the installer to use
///
/// # Arguments
/// * `selection` - Auto-detect or an explicit installer
/// * `search_path` - `PATH`-style value to search (`None` = process `PATH`)
///
/// # Returns
/// * `Ok(ProgramInstaller)` - The selected installer, confirmed to be on the search path
/// * `Err` - If the requested installer (or, for auto-detect, every preferred one) is missing
pub fn select_installer(
    selection: InstallerSelection,
    search_path: Option<OsString>,
) -> AccelResult<ProgramInstaller> {
    let kind = match selection {
        InstallerSelection::Explicit(kind) => {
            if find_program(kind.program(), search_path.as_ref()).is_none() {
                return Err(AccelError::InstallerNotFound {
                    name: kind.program().to_string(),
                });
            }
            debug!("Selecting user defined installer {} (confirmed to be installed)", kind);
            kind
        }
        InstallerSelection::Auto => {
            let kind = InstallerKind::PREFERENCE
                .iter()
                .copied()
                .find(|kind| find_program(kind.program(), search_path.as_ref()).is_some())
                .ok_or_else(|| AccelError::NoInstallerAvailable {
                    tried: InstallerKind::PREFERENCE
                        .iter()
                        .map(|k| k.program())
                        .collect::<Vec<_>>()
                        .join(", "),
                })?;
            debug!("Selecting {} as default installer", kind);
            kind
        }
    };

    Ok(ProgramInstaller::new(kind).with_search_path(search_path))
}
