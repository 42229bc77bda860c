//! Distributor - single consumer of the inbound queue, routes batches to destinations

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contracts::{validate_address, GatewayConfig, MetricBatch};

use crate::destination::Destination;
use crate::error::DispatcherError;
use crate::ingress::IngressHandle;
use crate::policy::DistributionPolicy;
use crate::pool::Pool;
use crate::transport::{ConsoleTransport, TcpTransport};

/// Address label of the console destination
pub const CONSOLE_DESTINATION: &str = "console";

/// Builder for creating a Distributor
pub struct DistributorBuilder {
    config: GatewayConfig,
}

impl DistributorBuilder {
    /// Create a new DistributorBuilder
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Spawn all destinations, build the policy and the inbound queue.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    /// Empty destination list, malformed or duplicate address
    #[instrument(name = "distributor_builder_build", skip(self))]
    pub fn build(self) -> Result<(IngressHandle, Distributor), DispatcherError> {
        let pool = Self::initialize_pool(&self.config)?;
        let policy = DistributionPolicy::for_pool(self.config.distribution, &pool)?;

        let (input_tx, input_rx) = mpsc::channel(self.config.inbound_cap.max(1));
        let pool = Arc::new(pool);
        let ingress = IngressHandle::new(input_tx, Arc::clone(pool.distributor_metrics()));

        Ok((ingress, Distributor::with_pool(pool, policy, input_rx)))
    }

    #[instrument(
        name = "distributor_initialize_pool",
        skip(config),
        fields(destinations = config.destinations.len(), console_out = config.console_out)
    )]
    fn initialize_pool(config: &GatewayConfig) -> Result<Pool, DispatcherError> {
        let mut pool = Pool::new();

        if config.console_out {
            let transport = ConsoleTransport::new(CONSOLE_DESTINATION);
            pool.register(Destination::spawn(
                transport,
                config.queue_cap,
                config.backoff,
            ))?;
            return Ok(pool);
        }

        if config.destinations.is_empty() {
            return Err(DispatcherError::EmptyPool);
        }

        for address in &config.destinations {
            validate_address(address)
                .map_err(|e| DispatcherError::invalid_address(address, e.to_string()))?;
            let transport = TcpTransport::new(address, config.connect_timeout());
            pool.register(Destination::spawn(
                transport,
                config.queue_cap,
                config.backoff,
            ))?;
            debug!(destination = %address, "Destination registered");
        }

        Ok(pool)
    }
}

/// Routes every inbound batch to the destinations chosen by the policy
pub struct Distributor {
    pool: Arc<Pool>,
    policy: DistributionPolicy,
    input_rx: mpsc::Receiver<MetricBatch>,
}

impl Distributor {
    /// Create a distributor over an already populated pool (for testing)
    pub fn with_pool(
        pool: Arc<Pool>,
        policy: DistributionPolicy,
        input_rx: mpsc::Receiver<MetricBatch>,
    ) -> Self {
        Self {
            pool,
            policy,
            input_rx,
        }
    }

    /// Shared pool, for stats collection
    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub fn policy(&self) -> &DistributionPolicy {
        &self.policy
    }

    /// Run the distributor main loop
    ///
    /// Consumes batches serially and enqueues them onto their targets.
    /// Returns when the inbound channel is closed.
    #[instrument(name = "distributor_run", skip(self))]
    pub async fn run(mut self) {
        info!(
            destinations = self.pool.len(),
            distribution = %self.policy.distribution(),
            "Distributor started"
        );

        let mut batch_count: u64 = 0;

        while let Some(batch) = self.input_rx.recv().await {
            batch_count += 1;
            self.route(batch);

            if batch_count.is_multiple_of(10_000) {
                debug!(batches = batch_count, "Distributor progress");
            }
        }

        info!(batches = batch_count, "Distributor input closed, shutting down");
    }

    /// Spawn the distributor as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Enqueue one batch on every target; never waits on a destination
    fn route(&self, batch: MetricBatch) {
        let metrics = self.pool.distributor_metrics();
        metrics.inc_routed();

        let targets = self.policy.resolve(&batch, &self.pool);
        let Some((last, rest)) = targets.split_last() else {
            warn!(lines = batch.len(), "No destination resolved, batch discarded");
            return;
        };

        for destination in rest {
            if !destination.enqueue(batch.clone()).is_accepted() {
                metrics.inc_dropped();
            }
        }
        // Last (or only) target takes ownership
        if !last.enqueue(batch).is_accepted() {
            metrics.inc_dropped();
        }
    }
}

/// Convenience function to create a distributor from configuration
#[instrument(name = "distributor_create", skip(config))]
pub fn create_distributor(
    config: GatewayConfig,
) -> Result<(IngressHandle, Distributor), DispatcherError> {
    DistributorBuilder::new(config).build()
}
