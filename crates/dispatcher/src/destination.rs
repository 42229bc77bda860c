//! Destination - one downstream endpoint with an isolated queue and delivery task

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

use contracts::{BackoffConfig, ConnectionState, DestinationStats, MetricBatch, Transport};

use crate::backoff::Backoff;
use crate::metrics::DestinationMetrics;

/// Drops are logged on the first occurrence and then once per this many
const DROP_LOG_EVERY: u64 = 1000;

/// Result of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    /// Queue at capacity; the offered batch was discarded
    DroppedQueueFull,
    /// Delivery task is gone (only during shutdown); the batch was discarded
    Closed,
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Connection state and last error, published by the delivery task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
}

/// Handle to a running destination
pub struct Destination {
    /// Endpoint address
    address: String,
    /// Outbound queue, written only by the distributor
    tx: mpsc::Sender<MetricBatch>,
    /// Shared counters
    metrics: Arc<DestinationMetrics>,
    /// Latest status from the delivery task
    status: watch::Receiver<DestinationStatus>,
    /// Delivery task handle
    worker_handle: JoinHandle<()>,
}

impl Destination {
    /// Create a Destination and spawn its delivery task
    pub fn spawn<T: Transport + 'static>(
        transport: T,
        queue_capacity: usize,
        backoff: BackoffConfig,
    ) -> Self {
        let address = transport.address().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let (status_tx, status) = watch::channel(DestinationStatus::default());
        let metrics = Arc::new(DestinationMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_address = address.clone();

        let worker_handle = tokio::spawn(async move {
            delivery_loop(
                transport,
                rx,
                worker_metrics,
                status_tx,
                backoff,
                worker_address,
            )
            .await;
        });

        Self {
            address,
            tx,
            metrics,
            status,
            worker_handle,
        }
    }

    /// Endpoint address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DestinationMetrics> {
        &self.metrics
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// Current status (state + last error)
    pub fn status(&self) -> DestinationStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes
    pub fn watch_status(&self) -> watch::Receiver<DestinationStatus> {
        self.status.clone()
    }

    /// Batches waiting in the outbound queue
    pub fn queue_len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Offer a batch to the outbound queue (non-blocking)
    ///
    /// A full queue drops the offered batch and leaves queued batches untouched.
    pub fn enqueue(&self, batch: MetricBatch) -> EnqueueOutcome {
        match self.tx.try_send(batch) {
            Ok(()) => {
                self.metrics.inc_accepted();
                EnqueueOutcome::Accepted
            }
            Err(mpsc::error::TrySendError::Full(batch)) => {
                let dropped = self.metrics.inc_dropped();
                if dropped == 1 || dropped.is_multiple_of(DROP_LOG_EVERY) {
                    warn!(
                        destination = %self.address,
                        lines = batch.len(),
                        dropped_total = dropped,
                        "Queue full, batch dropped"
                    );
                }
                EnqueueOutcome::DroppedQueueFull
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.inc_dropped();
                error!(destination = %self.address, "Delivery task closed unexpectedly");
                EnqueueOutcome::Closed
            }
        }
    }

    /// Counters and status as a serializable snapshot
    pub fn stats(&self) -> DestinationStats {
        let status = self.status();
        DestinationStats {
            address: self.address.clone(),
            state: status.state,
            last_error: status.last_error,
            accepted: self.metrics.accepted(),
            sent: self.metrics.sent(),
            sent_lines: self.metrics.sent_lines(),
            dropped: self.metrics.dropped(),
            lost: self.metrics.lost(),
            write_errors: self.metrics.write_errors(),
            connect_failures: self.metrics.connect_failures(),
            reconnects: self.metrics.reconnects(),
            queue_len: self.queue_len(),
        }
    }

    /// Stop the delivery task; queued batches are discarded
    pub fn abort(&self) {
        self.worker_handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.worker_handle.is_finished()
    }
}

impl Drop for Destination {
    fn drop(&mut self) {
        self.worker_handle.abort();
    }
}

/// Delivery task: dial, drain, write; redial on failure
#[instrument(
    name = "destination_delivery_loop",
    skip(transport, rx, metrics, status, backoff),
    fields(destination = %address)
)]
async fn delivery_loop<T: Transport>(
    mut transport: T,
    mut rx: mpsc::Receiver<MetricBatch>,
    metrics: Arc<DestinationMetrics>,
    status: watch::Sender<DestinationStatus>,
    backoff: BackoffConfig,
    address: String,
) {
    debug!(destination = %address, "Delivery task started");

    let mut backoff = Backoff::new(backoff);
    let mut connected_once = false;

    loop {
        // Nobody can enqueue anymore and nothing is left to deliver
        if rx.is_closed() && rx.is_empty() {
            break;
        }

        status.send_modify(|s| s.state = ConnectionState::Connecting);

        if let Err(e) = transport.connect().await {
            metrics.inc_connect_failures();
            let delay = backoff.next_delay();
            warn!(
                destination = %address,
                error = %e,
                retry_in_ms = delay.as_millis() as u64,
                "Connect failed"
            );
            status.send_modify(|s| {
                s.state = ConnectionState::Disconnected;
                s.last_error = Some(e.to_string());
            });
            tokio::time::sleep(delay).await;
            continue;
        }

        backoff.reset();
        if connected_once {
            metrics.inc_reconnects();
        }
        connected_once = true;
        status.send_modify(|s| s.state = ConnectionState::Connected);
        info!(destination = %address, "Connected");

        if !drain(&mut transport, &mut rx, &metrics, &status, &address).await {
            // Queue closed while connected
            break;
        }
    }

    if let Err(e) = transport.close().await {
        error!(destination = %address, error = %e, "Close failed on shutdown");
    }
    status.send_modify(|s| s.state = ConnectionState::Disconnected);

    debug!(destination = %address, "Delivery task stopped");
}

/// Write queued batches until a write fails.
///
/// Returns `true` when the connection broke and the caller should redial,
/// `false` when the queue is closed and drained.
async fn drain<T: Transport>(
    transport: &mut T,
    rx: &mut mpsc::Receiver<MetricBatch>,
    metrics: &DestinationMetrics,
    status: &watch::Sender<DestinationStatus>,
    address: &str,
) -> bool {
    while let Some(batch) = rx.recv().await {
        match transport.write_batch(&batch).await {
            Ok(()) => {
                metrics.inc_sent(batch.len());
                trace!(destination = %address, lines = batch.len(), "Batch written");
            }
            Err(e) => {
                // At-most-once: the in-flight batch is not retried
                metrics.inc_write_error();
                warn!(
                    destination = %address,
                    error = %e,
                    lines = batch.len(),
                    "Write failed, batch lost, reconnecting"
                );
                status.send_modify(|s| {
                    s.state = ConnectionState::Disconnected;
                    s.last_error = Some(e.to_string());
                });
                if let Err(e) = transport.close().await {
                    debug!(destination = %address, error = %e, "Close after write failure failed");
                }
                return true;
            }
        }
    }
    false
}
