//! Resolve the effective `GatewayConfig` from a config file and CLI overrides.

use contracts::{split_destinations, Distribution, GatewayConfig};
use tracing::info;

use config_loader::ConfigLoader;

use crate::cli::RunArgs;
use crate::error::{CliError, Result};

/// Load the config file (if any), apply overrides, then validate.
pub fn resolve_config(args: &RunArgs) -> Result<GatewayConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::parse_path(path)?
        }
        None if args.destinations.is_some() || args.console_out => GatewayConfig::default(),
        None => return Err(CliError::ConfigRequired),
    };

    apply_overrides(&mut config, args)?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut GatewayConfig, args: &RunArgs) -> Result<()> {
    if let Some(list) = &args.destinations {
        let destinations = split_destinations(list);
        info!(destinations = ?destinations, "Overriding destinations from CLI");
        config.destinations = destinations;
    }
    if let Some(distribution) = &args.distribution {
        config.distribution = distribution
            .parse::<Distribution>()
            .map_err(|e| CliError::invalid_override("distribution", e.to_string()))?;
    }
    if let Some(queue_cap) = args.queue_cap {
        config.queue_cap = queue_cap;
    }
    if args.console_out {
        config.console_out = true;
    }
    if let Some(secs) = args.stats_interval {
        config.stats_interval_secs = secs;
    }
    Ok(())
}
