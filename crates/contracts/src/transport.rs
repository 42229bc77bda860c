//! Transport trait - Destination output interface
//!
//! Abstracts the downstream connection a delivery task drives.

use crate::{ContractError, MetricBatch};

/// Downstream connection trait
///
/// Owned by exactly one delivery task, so all methods take `&mut self`.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Endpoint label (used for logging/metrics)
    fn address(&self) -> &str;

    /// Dial the endpoint, replacing any previous connection
    ///
    /// # Errors
    /// Returns connection error; the caller backs off and retries
    async fn connect(&mut self) -> Result<(), ContractError>;

    /// Write all lines of a batch, in order
    ///
    /// # Errors
    /// Returns write error; the connection must be considered dead
    async fn write_batch(&mut self, batch: &MetricBatch) -> Result<(), ContractError>;

    /// Drop the connection
    async fn close(&mut self) -> Result<(), ContractError>;
}
