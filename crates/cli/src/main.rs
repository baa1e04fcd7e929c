//! # Fanouter CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - parameter file validation and inspection
//! - the HTTP trigger server in front of the fanout topology
//! - graceful shutdown handling

mod cli;
mod commands;
mod error;
mod server;

use anyhow::Result;
use clap::Parser;
use contracts::AppConfig;
use observability::{ObservabilityConfig, WorkerGuard};
use tracing::info;

use cli::{Cli, Commands};
use commands::{resolve_app_config, run_info, run_serve, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // `serve` may send logs to the file named by its configuration
    let (app, metrics_port) = match &cli.command {
        Commands::Serve(args) => (
            resolve_app_config(args)?,
            (args.metrics_port != 0).then_some(args.metrics_port),
        ),
        _ => (AppConfig::default(), None),
    };
    let _guard = init_logging(&cli, &app, metrics_port)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Fanouter starting");

    let result = match &cli.command {
        Commands::Serve(_) => run_serve(app).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options and the process configuration
fn init_logging(
    cli: &Cli,
    app: &AppConfig,
    metrics_port: Option<u16>,
) -> Result<Option<WorkerGuard>> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        log_file: app.log.file.clone(),
        metrics_port,
        default_log_level: default_log_level.to_string(),
    })
}
