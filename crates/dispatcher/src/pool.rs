//! Pool - fixed registry of destinations

use std::collections::HashMap;
use std::sync::Arc;

use contracts::PoolSnapshot;

use crate::destination::Destination;
use crate::error::DispatcherError;
use crate::metrics::DistributorMetrics;

/// All configured destinations, keyed by address.
///
/// Membership is fixed once the distributor starts; after that the pool is
/// only read (routing, stats), so it is shared behind an `Arc` without locks.
pub struct Pool {
    destinations: Vec<Destination>,
    index: HashMap<String, usize>,
    metrics: Arc<DistributorMetrics>,
}

impl Pool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            destinations: Vec::new(),
            index: HashMap::new(),
            metrics: Arc::new(DistributorMetrics::new()),
        }
    }

    /// Add a destination (construction time only)
    pub fn register(&mut self, destination: Destination) -> Result<(), DispatcherError> {
        let address = destination.address().to_string();
        if self.index.contains_key(&address) {
            return Err(DispatcherError::DuplicateDestination { address });
        }
        self.index.insert(address, self.destinations.len());
        self.destinations.push(destination);
        Ok(())
    }

    /// All destinations in registration order
    pub fn all(&self) -> &[Destination] {
        &self.destinations
    }

    /// Destination registered under `address`
    pub fn lookup(&self, address: &str) -> Option<&Destination> {
        self.index.get(address).map(|&i| &self.destinations[i])
    }

    /// Registered addresses in registration order
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.destinations.iter().map(Destination::address)
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Distributor-wide counters
    pub fn distributor_metrics(&self) -> &Arc<DistributorMetrics> {
        &self.metrics
    }

    /// Stats for every destination plus global aggregates
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            routed: self.metrics.routed(),
            dropped: self.metrics.dropped(),
            inbound_rejected: self.metrics.inbound_rejected(),
            destinations: self.destinations.iter().map(Destination::stats).collect(),
        }
    }

    /// Stop every delivery task; queued batches are discarded
    pub fn abort_all(&self) {
        for destination in &self.destinations {
            destination.abort();
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}
