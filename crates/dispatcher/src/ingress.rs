//! Ingress boundary - the producer side of the inbound queue

use std::sync::Arc;
use tokio::sync::mpsc;

use contracts::MetricBatch;

use crate::error::DispatcherError;
use crate::metrics::DistributorMetrics;

/// Cloneable handle used by ingress listeners to submit batches
#[derive(Clone)]
pub struct IngressHandle {
    tx: mpsc::Sender<MetricBatch>,
    metrics: Arc<DistributorMetrics>,
}

impl IngressHandle {
    pub(crate) fn new(tx: mpsc::Sender<MetricBatch>, metrics: Arc<DistributorMetrics>) -> Self {
        Self { tx, metrics }
    }

    /// Submit without waiting; a full inbound queue rejects the batch
    pub fn submit(&self, batch: MetricBatch) -> Result<(), DispatcherError> {
        self.tx.try_send(batch).map_err(|e| match e {
            mpsc::error::TrySendError::Full(batch) => {
                self.metrics.inc_inbound_rejected();
                DispatcherError::InboundFull { lines: batch.len() }
            }
            mpsc::error::TrySendError::Closed(_) => DispatcherError::InboundClosed,
        })
    }

    /// Submit, waiting for inbound capacity (backpressure to the producer)
    pub async fn submit_wait(&self, batch: MetricBatch) -> Result<(), DispatcherError> {
        self.tx
            .send(batch)
            .await
            .map_err(|_| DispatcherError::InboundClosed)
    }

    /// Free slots in the inbound queue
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_rejects_when_full() {
        let (tx, _rx) = mpsc::channel(1);
        let metrics = Arc::new(DistributorMetrics::new());
        let ingress = IngressHandle::new(tx, Arc::clone(&metrics));

        ingress.submit(MetricBatch::from_lines(["a 1 1"])).unwrap();
        let err = ingress
            .submit(MetricBatch::from_lines(["b 2 2", "c 3 3"]))
            .unwrap_err();
        assert!(matches!(err, DispatcherError::InboundFull { lines: 2 }));
        assert_eq!(metrics.inbound_rejected(), 1);
    }

    #[tokio::test]
    async fn test_submit_after_close() {
        let (tx, rx) = mpsc::channel(1);
        let ingress = IngressHandle::new(tx, Arc::new(DistributorMetrics::new()));
        drop(rx);

        assert!(ingress.is_closed());
        let err = ingress
            .submit_wait(MetricBatch::from_lines(["a 1 1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatcherError::InboundClosed));
    }

    #[tokio::test]
    async fn test_rejections_show_in_pool_snapshot() {
        let config = contracts::GatewayConfig {
            console_out: true,
            inbound_cap: 1,
            ..Default::default()
        };
        // Distributor not running: the inbound queue holds one batch
        let (ingress, distributor) = crate::create_distributor(config).unwrap();

        ingress.submit(MetricBatch::from_lines(["a 1 1"])).unwrap();
        assert!(ingress.submit(MetricBatch::from_lines(["b 2 2"])).is_err());
        assert!(ingress.submit(MetricBatch::from_lines(["c 3 3"])).is_err());

        let snapshot = distributor.pool().snapshot();
        assert_eq!(snapshot.inbound_rejected, 2);
        assert_eq!(snapshot.routed, 0);
    }
}
