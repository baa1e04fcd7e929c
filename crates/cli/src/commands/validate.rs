//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    params_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<TopologySummary>,
}

#[derive(Serialize)]
struct TopologySummary {
    timeout_secs: u64,
    poolsize: usize,
    destination_count: usize,
    feed_count: usize,
    limiter_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(params = %args.params.display(), "Validating fanout parameters");

    let result = validate_params(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Fanout parameter validation failed")
    }
}

fn validate_params(args: &ValidateArgs) -> ValidationResult {
    let params_path = args.params.display().to_string();

    if !args.params.exists() {
        return ValidationResult {
            valid: false,
            params_path,
            error: Some(format!("File not found: {}", args.params.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_topology_from_path(&args.params) {
        Ok(topology) => {
            let warnings = config_loader::collect_warnings(&topology);

            ValidationResult {
                valid: true,
                params_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(TopologySummary {
                    timeout_secs: topology.timeout,
                    poolsize: topology.poolsize,
                    destination_count: topology.urls.len(),
                    feed_count: topology.feed_index().len(),
                    limiter_count: topology.binding_count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            params_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Fanout parameters are valid: {}", result.params_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Timeout: {}s", summary.timeout_secs);
            println!("  Pool size: {}", summary.poolsize);
            println!("  Destinations: {}", summary.destination_count);
            println!("  Feeds: {}", summary.feed_count);
            println!("  Limiters: {}", summary.limiter_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Fanout parameters are invalid: {}", result.params_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
