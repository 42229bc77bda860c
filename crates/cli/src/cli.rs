//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Metrics Gateway - fan-out of metric batches to downstream endpoints
#[derive(Parser, Debug)]
#[command(
    name = "metrics-gateway",
    author,
    version,
    about = "Metrics gateway output distribution engine",
    long_about = "Forwards batches of line-oriented metrics to one or more downstream \n\
                  endpoints, broadcasting or hash-routing by tenant, with bounded \n\
                  per-destination queues and automatic reconnects."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "METRICS_GATEWAY_VERBOSE")]
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
        env = "METRICS_GATEWAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gateway
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the resolved destination pool
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    ///
    /// Optional when --destinations or --console-out is given.
    #[arg(short, long, env = "METRICS_GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Comma-delimited destination list, replaces the configured one
    #[arg(long, env = "METRICS_GATEWAY_DESTINATIONS")]
    pub destinations: Option<String>,

    /// Distribution policy: broadcast or hash-route
    #[arg(long, env = "METRICS_GATEWAY_DISTRIBUTION")]
    pub distribution: Option<String>,

    /// Per-destination queue capacity (batches)
    #[arg(long, env = "METRICS_GATEWAY_QUEUE_CAP")]
    pub queue_cap: Option<usize>,

    /// Write all batches to stdout instead of the destinations
    #[arg(long, env = "METRICS_GATEWAY_CONSOLE_OUT")]
    pub console_out: bool,

    /// Plaintext line ingress address (host:port), disabled when unset
    #[arg(long, env = "METRICS_GATEWAY_LISTEN")]
    pub listen: Option<String>,

    /// Tenant attached to batches received on the plaintext ingress
    #[arg(long, default_value = "dev", env = "METRICS_GATEWAY_TENANT")]
    pub tenant: String,

    /// Prefix every ingress line with `<tenant>.`
    #[arg(long, env = "METRICS_GATEWAY_KEY_PREFIX")]
    pub key_prefix: bool,

    /// Maximum lines grouped into one batch by the plaintext ingress
    #[arg(long, default_value = "512", env = "METRICS_GATEWAY_INGRESS_BATCH_LINES")]
    pub ingress_batch_lines: usize,

    /// Prometheus exporter port (0 = disabled)
    #[arg(long, default_value = "0", env = "METRICS_GATEWAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Stats reporter period in seconds (0 = disabled)
    #[arg(long, env = "METRICS_GATEWAY_STATS_INTERVAL")]
    pub stats_interval: Option<u64>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "gateway.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the hash-route destination of these tenants (repeatable)
    #[arg(long = "route", value_name = "TENANT")]
    pub routes: Vec<String>,
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
