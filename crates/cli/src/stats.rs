//! Periodic pool statistics reporter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::PoolSnapshot;
use dispatcher::Pool;
use observability::{record_pool_snapshot, PoolRates};
use tracing::{info, warn};

/// Logs pool throughput every `interval` and optionally mirrors it into Prometheus
pub struct StatsReporter {
    pool: Arc<Pool>,
    interval: Duration,
    export: bool,
}

impl StatsReporter {
    pub fn new(pool: Arc<Pool>, interval: Duration, export: bool) -> Self {
        Self {
            pool,
            interval,
            export,
        }
    }

    /// Run forever; abort the task to stop
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // First tick completes immediately
        ticker.tick().await;

        let mut previous = self.pool.snapshot();
        let mut last = Instant::now();

        loop {
            ticker.tick().await;
            let current = self.pool.snapshot();
            let rates = PoolRates::between(&previous, &current, last.elapsed());
            last = Instant::now();

            self.report(&current, &rates);
            previous = current;
        }
    }

    fn report(&self, snapshot: &PoolSnapshot, rates: &PoolRates) {
        if self.export {
            record_pool_snapshot(snapshot);
        }

        info!(
            routed = snapshot.routed,
            dropped = snapshot.dropped,
            inbound_rejected = snapshot.inbound_rejected,
            connected = snapshot.connected(),
            destinations = snapshot.destinations.len(),
            batches_per_sec = format!("{:.1}", rates.batches_per_sec),
            "Pool stats"
        );

        for rate in &rates.destinations {
            if rate.dropped > 0 {
                warn!(
                    destination = %rate.address,
                    state = %rate.state,
                    dropped = rate.dropped,
                    queue_len = rate.queue_len,
                    "Destination dropping batches"
                );
            } else {
                info!(
                    destination = %rate.address,
                    state = %rate.state,
                    lines_per_sec = format!("{:.1}", rate.lines_per_sec),
                    queue_len = rate.queue_len,
                    "Destination stats"
                );
            }
        }
    }
}

/// Log the final counters of every destination
pub fn log_final(snapshot: &PoolSnapshot) {
    for d in &snapshot.destinations {
        info!(
            destination = %d.address,
            accepted = d.accepted,
            sent = d.sent,
            sent_lines = d.sent_lines,
            dropped = d.dropped,
            lost = d.lost,
            queued = d.queue_len,
            reconnects = d.reconnects,
            "Destination final stats"
        );
    }
    info!(
        routed = snapshot.routed,
        dropped = snapshot.dropped,
        inbound_rejected = snapshot.inbound_rejected,
        "Distributor final stats"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{GatewayConfig, MetricBatch};
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_reporter_runs_until_aborted() {
        let config = GatewayConfig {
            console_out: true,
            ..Default::default()
        };
        let (handle, distributor) = dispatcher::create_distributor(config).unwrap();
        let pool = Arc::clone(distributor.pool());
        let _task = distributor.spawn();

        let reporter = tokio::spawn(
            StatsReporter::new(Arc::clone(&pool), Duration::from_millis(10), false).run(),
        );

        handle.submit(MetricBatch::from_lines(["x 1 1"])).unwrap();
        sleep(Duration::from_millis(50)).await;
        assert!(!reporter.is_finished());

        reporter.abort();
        assert!(reporter.await.unwrap_err().is_cancelled());
        log_final(&pool.snapshot());
    }
}
