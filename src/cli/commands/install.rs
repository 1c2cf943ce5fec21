//! Install command - populate node_modules, from the cache when possible

use super::{format_duration, project_dir};
use crate::accelerator::{Accelerator, CacheWrite, InstallReport, InstallRequest, InstallSource};
use crate::cache::{require_manifest, CacheStore};
use crate::cli::Cli;
use crate::config::Settings;
use crate::error::AccelResult;
use crate::installer::{select_installer, Installer};
use crate::ui::{self, TaskSpinner, UiContext};
use tracing::info;

/// Execute an install
pub async fn execute(cli: &Cli, settings: &Settings, ctx: &UiContext) -> AccelResult<()> {
    let project_dir = project_dir(cli.directory.as_deref())?;
    require_manifest(&project_dir)?;
    let installer = select_installer(settings.installer, std::env::var_os("PATH"))?;
    let kind = installer.kind();

    let accelerator = Accelerator::new(
        CacheStore::new(&settings.cache_directory),
        settings.cache_limit,
        Box::new(installer),
    );
    let request = InstallRequest {
        project_dir,
        production: settings.production,
        no_cache: cli.no_cache,
        update: cli.update,
    };
    info!(
        project = %request.project_dir.display(),
        cache = %settings.cache_directory.display(),
        installer = %kind,
        "Installing dependencies"
    );

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!(
        "Installing dependencies of {}",
        request.project_dir.display()
    ));

    let report = match accelerator.install(&request).await {
        Ok(report) => report,
        Err(e) => {
            spinner.stop_error(&format!("Installation failed during {}", e.phase()));
            return Err(e);
        }
    };

    spinner.stop(&summary(&report, accelerator.installer()));

    if let CacheWrite::Failed(reason) = &report.cache_write {
        ui::step_warn_hint(ctx, "node_modules was not added to the cache", reason);
    }
    if report.evicted > 0 {
        ui::remark(
            ctx,
            &format!(
                "Evicted {} old cache entries (limit {})",
                report.evicted, settings.cache_limit
            ),
        );
    }

    Ok(())
}

/// One-line summary of a finished install
fn summary(report: &InstallReport, installer: &dyn Installer) -> String {
    let key = &report.key.as_str()[..12];
    let elapsed = format_duration(report.elapsed);

    match report.source {
        InstallSource::Cache => format!("Restored node_modules from cache {} in {}", key, elapsed),
        InstallSource::Installer => {
            let cached = match report.cache_write {
                CacheWrite::Stored => format!(", cached as {}", key),
                CacheWrite::Failed(_) => ", not cached".to_string(),
                CacheWrite::Disabled | CacheWrite::Unchanged => String::new(),
            };
            format!(
                "Installed node_modules with {} in {}{}",
                installer.kind(),
                elapsed,
                cached
            )
        }
    }
}
