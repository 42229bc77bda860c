//! Config validation
//!
//! Rules:
//! - at least one destination (unless console_out)
//! - every destination is host:port
//! - destination addresses unique
//! - queue_cap > 0, inbound_cap > 0
//! - backoff: min_delay_ms > 0, min <= max, factor >= 1

use std::collections::HashSet;

use contracts::{validate_address, ContractError, GatewayConfig};

/// Validate GatewayConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &GatewayConfig) -> Result<(), ContractError> {
    validate_destinations(config)?;
    validate_queues(config)?;
    validate_backoff(config)?;
    Ok(())
}

/// Destination list non-empty, well-formed and unique
fn validate_destinations(config: &GatewayConfig) -> Result<(), ContractError> {
    if config.destinations.is_empty() && !config.console_out {
        return Err(ContractError::config_validation(
            "destinations",
            "at least one destination is required",
        ));
    }

    let mut seen = HashSet::new();
    for address in &config.destinations {
        validate_address(address)?;
        if !seen.insert(address.as_str()) {
            return Err(ContractError::config_validation(
                format!("destinations[{address}]"),
                "duplicate destination",
            ));
        }
    }
    Ok(())
}

/// Queue capacities
fn validate_queues(config: &GatewayConfig) -> Result<(), ContractError> {
    if config.queue_cap == 0 {
        return Err(ContractError::config_validation(
            "queue_cap",
            "queue_cap must be > 0",
        ));
    }
    if config.inbound_cap == 0 {
        return Err(ContractError::config_validation(
            "inbound_cap",
            "inbound_cap must be > 0",
        ));
    }
    Ok(())
}

/// Reconnect backoff
fn validate_backoff(config: &GatewayConfig) -> Result<(), ContractError> {
    let backoff = &config.backoff;

    if backoff.min_delay_ms == 0 {
        return Err(ContractError::config_validation(
            "backoff.min_delay_ms",
            "min_delay_ms must be > 0",
        ));
    }
    if backoff.min_delay_ms > backoff.max_delay_ms {
        return Err(ContractError::config_validation(
            "backoff.min_delay_ms / backoff.max_delay_ms",
            format!(
                "min_delay_ms ({}) must be <= max_delay_ms ({})",
                backoff.min_delay_ms, backoff.max_delay_ms
            ),
        ));
    }
    if backoff.factor.is_nan() || backoff.factor < 1.0 {
        return Err(ContractError::config_validation(
            "backoff.factor",
            format!("factor must be >= 1.0, got {}", backoff.factor),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> GatewayConfig {
        GatewayConfig {
            destinations: vec!["10.0.0.1:2003".into(), "10.0.0.2:2003".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_empty_destinations() {
        let mut config = minimal_config();
        config.destinations.clear();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("at least one destination"), "got: {err}");
    }

    #[test]
    fn test_console_out_needs_no_destinations() {
        let config = GatewayConfig {
            console_out: true,
            ..Default::default()
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_malformed_address() {
        let mut config = minimal_config();
        config.destinations.push("graphite".into());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("host:port"), "got: {err}");
    }

    #[test]
    fn test_duplicate_destination() {
        let mut config = minimal_config();
        config.destinations.push("10.0.0.1:2003".into());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate destination"), "got: {err}");
    }

    #[test]
    fn test_zero_queue_cap() {
        let mut config = minimal_config();
        config.queue_cap = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("queue_cap must be > 0"), "got: {err}");
    }

    #[test]
    fn test_invalid_backoff_range() {
        let mut config = minimal_config();
        config.backoff.min_delay_ms = 500;
        config.backoff.max_delay_ms = 100;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("min_delay_ms"), "got: {err}");
    }

    #[test]
    fn test_invalid_backoff_factor() {
        let mut config = minimal_config();
        config.backoff.factor = 0.5;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("factor must be >= 1.0"), "got: {err}");
    }
}
