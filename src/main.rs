//! npm-accel - Accelerator for npm
//!
//! CLI entry point: loads configuration, initializes logging and runs an
//! install or a benchmark.

use clap::Parser;
use console::style;
use npm_accel::cli::{commands, Cli};
use npm_accel::config::{ConfigManager, LogFormat, Settings};
use npm_accel::error::AccelResult;
use npm_accel::ui::UiContext;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AccelResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(&cli, config.general.log_format);
    debug!("Using config file {}", config_manager.path().display());

    let settings = Settings::resolve(&cli.overrides(), &config, |name| std::env::var(name).ok())?;

    let ctx = UiContext::detect().with_quiet(cli.quiet > 0);

    if cli.benchmark {
        commands::benchmark(&cli, &settings, &ctx).await
    } else {
        commands::install(&cli, &settings, &ctx).await
    }
}

/// Initialize logging: -q = error, default = warn, -v = info, -vv = debug
fn init_logging(cli: &Cli, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match (cli.quiet, cli.verbose) {
            (q, _) if q > 0 => "error",
            (_, 0) => "warn",
            (_, 1) => "info",
            _ => "debug",
        };
        EnvFilter::new(format!("npm_accel={}", level))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.without_time().init(),
    }
}
