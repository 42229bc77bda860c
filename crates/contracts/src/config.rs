//! GatewayConfig - Config Loader output
//!
//! Destinations, distribution policy, queue sizing and reconnect behaviour.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::ContractError;

/// Complete gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Downstream endpoints (`host:port`), array or comma-delimited string
    #[serde(default, deserialize_with = "deserialize_destinations")]
    pub destinations: Vec<String>,

    /// Routing policy
    #[serde(default)]
    pub distribution: Distribution,

    /// Per-destination outbound queue capacity (batches)
    #[serde(default = "default_queue_cap")]
    pub queue_cap: usize,

    /// Global inbound queue capacity (batches)
    #[serde(default = "default_inbound_cap")]
    pub inbound_cap: usize,

    /// Dial timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Write every batch to stdout instead of the configured destinations
    #[serde(default)]
    pub console_out: bool,

    /// Stats reporter period in seconds (0 = disabled)
    #[serde(default)]
    pub stats_interval_secs: u64,

    /// Reconnect backoff (kept last: serializes as a TOML table)
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_queue_cap() -> usize {
    4096
}

fn default_inbound_cap() -> usize {
    32768
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            distribution: Distribution::default(),
            queue_cap: default_queue_cap(),
            inbound_cap: default_inbound_cap(),
            connect_timeout_ms: default_connect_timeout_ms(),
            backoff: BackoffConfig::default(),
            console_out: false,
            stats_interval_secs: 0,
        }
    }
}

impl GatewayConfig {
    /// Dial timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Stats reporter period (None = disabled)
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }
}

/// Split a comma-delimited destination list, trimming blanks
pub fn split_destinations(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check that `address` is `host:port` with a non-empty host and a port in 1..=65535
///
/// IPv6 hosts must be bracketed (`[::1]:2003`).
pub fn validate_address(address: &str) -> Result<(), ContractError> {
    let field = format!("destinations[{address}]");
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| ContractError::config_validation(&field, "expected host:port"))?;

    if host.contains([':', '[', ']']) {
        return match address.parse::<SocketAddr>() {
            Ok(addr) if addr.port() != 0 => Ok(()),
            Ok(_) => Err(ContractError::config_validation(
                &field,
                format!("invalid port '{port}'"),
            )),
            Err(_) => Err(ContractError::config_validation(
                &field,
                "expected host:port or [ipv6]:port",
            )),
        };
    }

    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(ContractError::config_validation(
            &field,
            "host is empty or contains whitespace",
        ));
    }

    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ContractError::config_validation(
            &field,
            format!("invalid port '{port}'"),
        )),
        Ok(_) => Ok(()),
    }
}

fn deserialize_destinations<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Destinations {
        List(Vec<String>),
        Delimited(String),
    }

    Ok(match Destinations::deserialize(deserializer)? {
        Destinations::List(list) => list.into_iter().map(|s| s.trim().to_string()).collect(),
        Destinations::Delimited(s) => split_destinations(&s),
    })
}

/// Distribution policy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Distribution {
    /// Every destination receives every batch
    #[default]
    Broadcast,
    /// Each batch goes to one destination chosen by hashing its routing key
    HashRoute,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::HashRoute => "hash-route",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "broadcast" => Ok(Self::Broadcast),
            "hash-route" => Ok(Self::HashRoute),
            other => Err(ContractError::config_validation(
                "distribution",
                format!("unknown distribution '{other}', expected broadcast or hash-route"),
            )),
        }
    }
}

/// Exponential reconnect backoff
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First delay after a failed dial
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound on the delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor per consecutive failure
    #[serde(default = "default_factor")]
    pub factor: f64,
}

fn default_min_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_factor() -> f64 {
    2.0
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            factor: default_factor(),
        }
    }
}

impl BackoffConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
