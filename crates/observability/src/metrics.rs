//! Pool metrics recording
//!
//! Mirrors `PoolSnapshot` counters into the `metrics` facade and derives
//! per-interval rates for the periodic stats log.

use std::time::Duration;

use contracts::{ConnectionState, PoolSnapshot};
use metrics::{counter, gauge};

/// Record a pool snapshot
///
/// Called by the stats reporter on every tick.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_pool_snapshot;
///
/// record_pool_snapshot(&pool.snapshot());
/// ```
pub fn record_pool_snapshot(snapshot: &PoolSnapshot) {
    counter!("metrics_gateway_batches_routed_total").absolute(snapshot.routed);
    counter!("metrics_gateway_batches_dropped_total").absolute(snapshot.dropped);
    gauge!("metrics_gateway_destinations_connected").set(snapshot.connected() as f64);

    for d in &snapshot.destinations {
        let label = d.address.clone();

        counter!("metrics_gateway_destination_accepted_total", "destination" => label.clone())
            .absolute(d.accepted);
        counter!("metrics_gateway_destination_sent_total", "destination" => label.clone())
            .absolute(d.sent);
        counter!("metrics_gateway_destination_sent_lines_total", "destination" => label.clone())
            .absolute(d.sent_lines);
        counter!("metrics_gateway_destination_dropped_total", "destination" => label.clone())
            .absolute(d.dropped);
        counter!("metrics_gateway_destination_lost_total", "destination" => label.clone())
            .absolute(d.lost);
        counter!(
            "metrics_gateway_destination_connect_failures_total",
            "destination" => label.clone()
        )
        .absolute(d.connect_failures);

        gauge!("metrics_gateway_destination_queue_len", "destination" => label.clone())
            .set(d.queue_len as f64);
        gauge!("metrics_gateway_destination_state", "destination" => label)
            .set(state_value(d.state));
    }
}

/// Record a submission rejected at the inbound queue
pub fn record_inbound_rejected(lines: usize) {
    counter!("metrics_gateway_inbound_rejected_total").increment(1);
    counter!("metrics_gateway_inbound_rejected_lines_total").increment(lines as u64);
}

/// Gauge encoding of a connection state
fn state_value(state: ConnectionState) -> f64 {
    match state {
        ConnectionState::Disconnected => 0.0,
        ConnectionState::Connecting => 1.0,
        ConnectionState::Connected => 2.0,
    }
}

/// Throughput of one destination over an interval
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRate {
    pub address: String,
    pub state: ConnectionState,
    pub lines_per_sec: f64,
    /// Drops during the interval
    pub dropped: u64,
    pub queue_len: usize,
}

/// Throughput of the whole pool over an interval
#[derive(Debug, Clone, PartialEq)]
pub struct PoolRates {
    pub batches_per_sec: f64,
    pub dropped: u64,
    pub destinations: Vec<DestinationRate>,
}

impl PoolRates {
    /// Rates between two snapshots taken `elapsed` apart
    ///
    /// Destinations missing from `previous` are measured from zero.
    pub fn between(previous: &PoolSnapshot, current: &PoolSnapshot, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let per_sec = |delta: u64| if secs > 0.0 { delta as f64 / secs } else { 0.0 };

        let destinations = current
            .destinations
            .iter()
            .map(|d| {
                let before = previous.destination(&d.address);
                let lines = d
                    .sent_lines
                    .saturating_sub(before.map_or(0, |b| b.sent_lines));
                let dropped = d.dropped.saturating_sub(before.map_or(0, |b| b.dropped));
                DestinationRate {
                    address: d.address.clone(),
                    state: d.state,
                    lines_per_sec: per_sec(lines),
                    dropped,
                    queue_len: d.queue_len,
                }
            })
            .collect();

        Self {
            batches_per_sec: per_sec(current.routed.saturating_sub(previous.routed)),
            dropped: current.dropped.saturating_sub(previous.dropped),
            destinations,
        }
    }
}
