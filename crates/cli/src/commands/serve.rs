//! `serve` command implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, FileParamRepo};
use contracts::AppConfig;
use dispatcher::{ChannelLimiterFactory, ConfiguredSenderFactory, FanoutBuilder, MetricsSnapshot};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::ServeArgs;
use crate::error::CliError;
use crate::server;

/// Load the process configuration and apply CLI overrides
///
/// Without `--config` the built-in defaults are used.
pub fn resolve_app_config(args: &ServeArgs) -> Result<AppConfig> {
    let mut app = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            ConfigLoader::load_app_config(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => AppConfig::default(),
    };

    if let Some(ref params) = args.params {
        app.urlrepo.path = params.clone();
    }
    if let Some(port) = args.port {
        app.api.http_port = port;
    }
    if let Some(ref log_file) = args.log_file {
        app.log.file = Some(log_file.clone());
    }
    if args.debug {
        app.log.file = None;
    }

    Ok(app)
}

/// Execute the `serve` command
pub async fn run_serve(app: AppConfig) -> Result<()> {
    info!(
        params = %app.urlrepo.path.display(),
        port = app.api.http_port,
        log_file = ?app.log.file,
        "Configuration loaded"
    );

    let cancel = CancellationToken::new();
    let fanouter = FanoutBuilder::new(
        FileParamRepo::new(&app.urlrepo.path),
        ConfiguredSenderFactory::new(),
        ChannelLimiterFactory::new(),
    )
    .build(&cancel)
    .await
    .with_context(|| {
        format!(
            "Failed to start fanout topology from {}",
            app.urlrepo.path.display()
        )
    })?;
    let fanouter = Arc::new(fanouter);

    let addr = SocketAddr::from(([0, 0, 0, 0], app.api.http_port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(source) => {
            fanouter.shutdown().await;
            return Err(CliError::server_bind(addr, source).into());
        }
    };
    info!(addr = %addr, "HTTP server listening");

    let mut server = tokio::spawn(server::serve(
        listener,
        Arc::clone(&fanouter),
        cancel.clone(),
    ));

    let finished = tokio::select! {
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping...");
            None
        }
        joined = &mut server => Some(joined),
    };

    cancel.cancel();
    let joined = match finished {
        Some(joined) => joined,
        None => server.await,
    };

    fanouter.shutdown().await;
    print_summary(&fanouter.metrics());

    match joined {
        Ok(result) => result?,
        Err(e) => anyhow::bail!("HTTP server task failed: {e}"),
    }

    info!("Fanouter finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print per-destination counters collected during the run
fn print_summary(metrics: &[(String, MetricsSnapshot)]) {
    println!("\n=== Fanout Statistics ===\n");
    println!(
        "  {:<20} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "destination", "admitted", "dropped", "released", "sent", "failed"
    );
    for (destination, m) in metrics {
        println!(
            "  {:<20} {:>10} {:>10} {:>10} {:>10} {:>10}",
            destination, m.admitted, m.dropped, m.released, m.sent, m.failed
        );
    }
    println!();
}
