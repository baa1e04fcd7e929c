//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Fanouter - rate-limited HTTP fanout dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "fanouter",
    author,
    version,
    about = "Rate-limited HTTP fanout dispatcher",
    long_about = "Receives feed triggers over HTTP and fans each one out to every \n\
                  destination bound to the feed, pacing delivery per destination \n\
                  under a configured queries-per-second ceiling."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FANOUTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FANOUTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the fanout topology and the HTTP trigger server
    Serve(ServeArgs),

    /// Validate a fanout parameter file without starting anything
    Validate(ValidateArgs),

    /// Display the fanout topology described by a parameter file
    Info(InfoArgs),
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Path to the process configuration file (TOML or JSON)
    #[arg(short, long, env = "FANOUTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the fanout parameter file path
    #[arg(long, env = "FANOUTER_PARAMS")]
    pub params: Option<PathBuf>,

    /// Override the HTTP listening port
    #[arg(short, long, env = "FANOUTER_PORT")]
    pub port: Option<u16>,

    /// Override the log file path
    #[arg(long, env = "FANOUTER_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log to stdout even when a log file is configured
    #[arg(long)]
    pub debug: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FANOUTER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the fanout parameter file to validate
    #[arg(short, long, default_value = "params.json")]
    pub params: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the fanout parameter file
    #[arg(short, long, default_value = "params.json")]
    pub params: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides_parse() {
        let cli = Cli::try_parse_from([
            "fanouter",
            "-v",
            "serve",
            "--config",
            "config.toml",
            "--params",
            "p.json",
            "--port",
            "9090",
            "--debug",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.params, Some(PathBuf::from("p.json")));
        assert_eq!(args.port, Some(9090));
        assert!(args.debug);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["fanouter", "-q", "-v", "info"]).is_err());
    }

    #[test]
    fn test_validate_defaults() {
        let cli = Cli::try_parse_from(["fanouter", "validate"]).unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.params, PathBuf::from("params.json"));
        assert!(!args.json);
    }
}
