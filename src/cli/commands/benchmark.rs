//! Benchmark command - compare plain installers against the accelerator
//!
//! Each plain installer runs with caching fully disabled. The accelerator
//! runs against a throwaway cache directory, so its first round is a miss
//! and later rounds are hits.

use super::{format_duration, project_dir};
use crate::accelerator::{Accelerator, InstallRequest};
use crate::cache::store::remove_path;
use crate::cache::{CacheStore, MODULES_DIR};
use crate::cli::Cli;
use crate::config::Settings;
use crate::error::{AccelError, AccelResult};
use crate::installer::{select_installer, InstallerKind, InstallerSelection};
use crate::ui::{self, TaskSpinner, UiContext};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Label of the accelerated approach in the report
const ACCELERATED: &str = "npm-accel";

/// Outcome of one benchmark round
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRun {
    /// Installer name or "npm-accel"
    pub approach: String,
    /// 1-based round number
    pub iteration: u32,
    /// Wall-clock time, `None` when the round failed
    pub elapsed: Option<Duration>,
}

/// Execute the benchmark
pub async fn execute(cli: &Cli, settings: &Settings, ctx: &UiContext) -> AccelResult<()> {
    let project_dir = project_dir(cli.directory.as_deref())?;
    let search_path = std::env::var_os("PATH");
    let scratch =
        TempDir::new().map_err(|e| AccelError::io("creating benchmark cache directory", e))?;

    let mut runs = Vec::new();

    for &kind in InstallerKind::all() {
        let selection = InstallerSelection::Explicit(kind);
        let Ok(installer) = select_installer(selection, search_path.clone()) else {
            debug!("Skipping {} in benchmark (not installed)", kind);
            continue;
        };
        let accelerator = Accelerator::new(
            CacheStore::new(scratch.path().join(kind.program())),
            settings.cache_limit,
            Box::new(installer),
        );
        let request = InstallRequest {
            project_dir: project_dir.clone(),
            production: settings.production,
            no_cache: true,
            update: true,
        };
        let rounds =
            run_approach(ctx, kind.program(), &accelerator, &request, cli.iterations).await?;
        runs.extend(rounds);
    }

    let installer = select_installer(settings.installer, search_path)?;
    let accelerator = Accelerator::new(
        CacheStore::new(scratch.path().join(ACCELERATED)),
        settings.cache_limit,
        Box::new(installer),
    );
    let request = InstallRequest {
        project_dir: project_dir.clone(),
        production: settings.production,
        no_cache: false,
        update: false,
    };
    runs.extend(run_approach(ctx, ACCELERATED, &accelerator, &request, cli.iterations).await?);

    ui::section(ctx, &format!("Benchmark results for {}", project_dir.display()));
    let widths = [12, 9, 12, 8];
    ui::table_row(
        ctx,
        &["Approach".into(), "Iteration".into(), "Elapsed".into(), "Relative".into()],
        &widths,
        true,
    );
    for row in report_rows(&runs) {
        ui::table_row(ctx, &row, &widths, false);
    }

    Ok(())
}

/// Run one approach for `iterations` rounds, stopping at the first failure
async fn run_approach(
    ctx: &UiContext,
    approach: &str,
    accelerator: &Accelerator,
    request: &InstallRequest,
    iterations: u32,
) -> AccelResult<Vec<BenchmarkRun>> {
    clear_modules(&request.project_dir)?;

    let mut runs = Vec::new();
    for iteration in 1..=iterations {
        let mut spinner = TaskSpinner::new(ctx);
        spinner.start(&format!("Benchmarking {} ({}/{})", approach, iteration, iterations));

        match accelerator.install(request).await {
            Ok(report) => {
                spinner.stop(&format!(
                    "{} ({}/{}) took {}",
                    approach,
                    iteration,
                    iterations,
                    format_duration(report.elapsed)
                ));
                runs.push(BenchmarkRun {
                    approach: approach.to_string(),
                    iteration,
                    elapsed: Some(report.elapsed),
                });
            }
            Err(e) => {
                spinner.stop_error(&format!("{} ({}/{}) failed", approach, iteration, iterations));
                warn!(approach, error = %e, "Benchmark round failed, skipping remaining rounds");
                runs.push(BenchmarkRun {
                    approach: approach.to_string(),
                    iteration,
                    elapsed: None,
                });
                break;
            }
        }
    }
    Ok(runs)
}

fn clear_modules(project_dir: &Path) -> AccelResult<()> {
    let modules = project_dir.join(MODULES_DIR);
    remove_path(&modules).map_err(|e| AccelError::io(format!("clearing {}", modules.display()), e))
}

/// Table cells for each run, relative to the first successful run
fn report_rows(runs: &[BenchmarkRun]) -> Vec<Vec<String>> {
    let baseline = runs.iter().find_map(|run| run.elapsed);

    runs.iter()
        .map(|run| {
            let (elapsed, relative) = match (run.elapsed, baseline) {
                (Some(elapsed), Some(baseline)) if !baseline.is_zero() => (
                    format_duration(elapsed),
                    format!("{:.0}%", elapsed.as_secs_f64() / baseline.as_secs_f64() * 100.0),
                ),
                (Some(elapsed), _) => (format_duration(elapsed), "-".to_string()),
                (None, _) => ("(failed)".to_string(), "-".to_string()),
            };
            vec![run.approach.clone(), run.iteration.to_string(), elapsed, relative]
        })
        .collect()
}
