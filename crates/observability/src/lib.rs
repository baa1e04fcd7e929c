//! # Observability
//!
//! Tracing and Prometheus setup for fanouter.
//!
//! ## Features
//!
//! - Tracing initialization (JSON/Pretty/Compact, stdout or append-only file)
//! - Prometheus metrics export
//! - Counter helpers for triggers, admissions, drops and requests
//!
//! ## Usage
//!
//! ```ignore
//! let _guard = observability::init_with_config(ObservabilityConfig {
//!     log_file: Some("fanouter.log".into()),
//!     ..Default::default()
//! })?;
//!
//! observability::record_request("dest-1", true);
//! ```

pub mod metrics;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_signal_admitted, record_signal_dropped, record_request, record_trigger,
};
pub use tracing_appender::non_blocking::WorkerGuard;

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log format
    pub log_format: LogFormat,
    /// Append logs to this file instead of stdout
    pub log_file: Option<PathBuf>,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Default log level when RUST_LOG is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            log_file: None,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs
    #[default]
    Json,
    /// Human-readable multi-line format
    Pretty,
    /// Single-line format
    Compact,
}

/// Initialize with default configuration (JSON to stdout, no exporter)
pub fn init() -> Result<Option<WorkerGuard>> {
    init_with_config(ObservabilityConfig::default())
}

/// Initialize tracing and, when configured, the Prometheus exporter
///
/// When logging to a file the returned guard flushes pending lines on drop
/// and must be kept alive for the life of the process.
pub fn init_with_config(config: ObservabilityConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let (writer, guard, ansi) = match config.log_file.as_deref() {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            (writer, Some(guard), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), None, true),
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        log_file = ?config.log_file,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(guard)
}

/// Initialize only the Prometheus exporter
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

/// Non-blocking append-only writer for `path`
fn file_writer(path: &Path) -> Result<(BoxMakeWriter, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log path has no file name: {}", path.display()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(writer), guard))
}
