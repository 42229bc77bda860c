//! `run` command implementation.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::ingress::{self, LineIngress};
use crate::settings::resolve_config;
use crate::stats::{self, StatsReporter};

/// Execute the `run` command
pub async fn run_gateway(args: &RunArgs) -> Result<()> {
    let config = resolve_config(args).context("Failed to resolve configuration")?;

    info!(
        destinations = ?config.destinations,
        distribution = %config.distribution,
        queue_cap = config.queue_cap,
        inbound_cap = config.inbound_cap,
        console_out = config.console_out,
        "Configuration loaded"
    );

    let export_metrics = args.metrics_port != 0;
    if export_metrics {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let stats_interval = config.stats_interval();
    let (ingress_handle, distributor) =
        dispatcher::create_distributor(config).context("Failed to create distributor")?;
    let pool = Arc::clone(distributor.pool());
    let mut distributor_task = distributor.spawn();

    let reporter_task = match stats_interval {
        Some(interval) => Some(tokio::spawn(
            StatsReporter::new(Arc::clone(&pool), interval, export_metrics).run(),
        )),
        None if export_metrics => {
            warn!("--metrics-port set without a stats interval, Prometheus will see no pool stats");
            None
        }
        None => None,
    };

    let ingress_task = match &args.listen {
        Some(address) => {
            let listener = ingress::bind(address).await?;
            let line_ingress = LineIngress::new(
                ingress_handle.clone(),
                args.tenant.as_str(),
                args.key_prefix,
                args.ingress_batch_lines,
            );
            Some(tokio::spawn(line_ingress.serve(listener)))
        }
        None => {
            info!("No --listen address, gateway idle until an ingress submits batches");
            None
        }
    };

    tokio::select! {
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping gateway...");
        }
        _ = &mut distributor_task => {
            warn!("Distributor stopped");
        }
    }

    if let Some(task) = ingress_task {
        task.abort();
    }
    if let Some(task) = reporter_task {
        task.abort();
    }
    drop(ingress_handle);
    distributor_task.abort();
    pool.abort_all();

    stats::log_final(&pool.snapshot());
    info!("Metrics gateway finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A signal that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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
