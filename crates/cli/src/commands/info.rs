//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{BackoffConfig, Distribution, GatewayConfig};
use dispatcher::{tenant_key, DistributionPolicy, CONSOLE_DESTINATION};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Pool layout for JSON output
#[derive(Serialize)]
struct PoolInfo {
    distribution: Distribution,
    queue_cap: usize,
    inbound_cap: usize,
    connect_timeout_ms: u64,
    backoff: BackoffConfig,
    destinations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hash_table: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    routes: Vec<RouteInfo>,
}

#[derive(Serialize)]
struct RouteInfo {
    tenant: String,
    destination: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let pool_info = build_pool_info(&config, &args.routes);
    if args.json {
        let json =
            serde_json::to_string_pretty(&pool_info).context("Failed to serialize pool info")?;
        println!("{}", json);
    } else {
        print_pool_info(&pool_info);
    }

    Ok(())
}

fn build_pool_info(config: &GatewayConfig, tenants: &[String]) -> PoolInfo {
    let destinations = if config.console_out {
        vec![CONSOLE_DESTINATION.to_string()]
    } else {
        config.destinations.clone()
    };

    let policy = match config.distribution {
        Distribution::Broadcast => DistributionPolicy::Broadcast,
        Distribution::HashRoute => {
            DistributionPolicy::hash_route_over(destinations.iter().cloned(), tenant_key)
        }
    };

    let (hash_table, routes) = match &policy {
        DistributionPolicy::HashRoute { table, .. } => {
            let routes = tenants
                .iter()
                .filter_map(|tenant| {
                    policy.route_key(tenant).map(|destination| RouteInfo {
                        tenant: tenant.clone(),
                        destination: destination.to_string(),
                    })
                })
                .collect();
            (table.clone(), routes)
        }
        DistributionPolicy::Broadcast => (Vec::new(), Vec::new()),
    };

    PoolInfo {
        distribution: config.distribution,
        queue_cap: config.queue_cap,
        inbound_cap: config.inbound_cap,
        connect_timeout_ms: config.connect_timeout_ms,
        backoff: config.backoff,
        destinations,
        hash_table,
        routes,
    }
}

fn print_pool_info(pool: &PoolInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Metrics Gateway Destinations                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Distribution");
    println!("   ├─ Policy: {}", pool.distribution);
    println!("   ├─ Queue capacity: {} batches", pool.queue_cap);
    println!("   ├─ Inbound capacity: {} batches", pool.inbound_cap);
    println!("   ├─ Connect timeout: {} ms", pool.connect_timeout_ms);
    println!(
        "   └─ Backoff: {}..{} ms (x{})",
        pool.backoff.min_delay_ms, pool.backoff.max_delay_ms, pool.backoff.factor
    );

    println!("\n📤 Destinations ({})", pool.destinations.len());
    for (i, destination) in pool.destinations.iter().enumerate() {
        let prefix = if i == pool.destinations.len() - 1 { "└─" } else { "├─" };
        println!("   {} {}", prefix, destination);
    }

    if !pool.hash_table.is_empty() {
        println!("\n🔀 Hash-route table");
        for (slot, destination) in pool.hash_table.iter().enumerate() {
            let prefix = if slot == pool.hash_table.len() - 1 { "└─" } else { "├─" };
            println!("   {} [{}] {}", prefix, slot, destination);
        }
    }

    if !pool.routes.is_empty() {
        println!("\n🧭 Routes");
        for (i, route) in pool.routes.iter().enumerate() {
            let prefix = if i == pool.routes.len() - 1 { "└─" } else { "├─" };
            println!("   {} {} → {}", prefix, route.tenant, route.destination);
        }
    }

    println!();
}
