//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{Distribution, GatewayConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    distribution: Distribution,
    destination_count: usize,
    queue_cap: usize,
    inbound_cap: usize,
    console_out: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

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
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    distribution: config.distribution,
                    destination_count: config.destinations.len(),
                    queue_cap: config.queue_cap,
                    inbound_cap: config.inbound_cap,
                    console_out: config.console_out,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Non-fatal issues
fn collect_warnings(config: &GatewayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.console_out && !config.destinations.is_empty() {
        warnings.push(format!(
            "console_out is set - {} configured destination(s) will be ignored",
            config.destinations.len()
        ));
    }

    if config.distribution == Distribution::HashRoute && config.destinations.len() == 1 {
        warnings.push("hash-route with a single destination behaves like broadcast".to_string());
    }

    if config.queue_cap > config.inbound_cap {
        warnings.push(format!(
            "queue_cap ({}) exceeds inbound_cap ({})",
            config.queue_cap, config.inbound_cap
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Distribution: {}", summary.distribution);
            println!("  Destinations: {}", summary.destination_count);
            println!("  Queue capacity: {}", summary.queue_cap);
            println!("  Inbound capacity: {}", summary.inbound_cap);
            if summary.console_out {
                println!("  Console output: enabled");
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
