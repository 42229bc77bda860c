//! Destination and distributor counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single destination
///
/// Written by the distributor (accepted/dropped) and by the destination's
/// own delivery task (everything else); read by stats collection.
#[derive(Debug, Default)]
pub struct DestinationMetrics {
    /// Batches admitted to the queue
    accepted: AtomicU64,
    /// Batches written to the socket
    sent: AtomicU64,
    /// Lines written to the socket
    sent_lines: AtomicU64,
    /// Batches dropped due to full queue
    dropped: AtomicU64,
    /// Batches lost on write failure
    lost: AtomicU64,
    write_errors: AtomicU64,
    connect_failures: AtomicU64,
    reconnects: AtomicU64,
}

impl DestinationMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn inc_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn sent_lines(&self) -> u64 {
        self.sent_lines.load(Ordering::Relaxed)
    }

    /// Record one batch of `lines` lines written
    pub fn inc_sent(&self, lines: usize) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.sent_lines.fetch_add(lines as u64, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Increment dropped count, returning the new total
    pub fn inc_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    /// Record a failed write and the batch it took down with it
    pub fn inc_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
        self.lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connect_failures(&self) -> u64 {
        self.connect_failures.load(Ordering::Relaxed)
    }

    pub fn inc_connect_failures(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn inc_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }
}

/// Counters owned by the distributor
#[derive(Debug, Default)]
pub struct DistributorMetrics {
    /// Batches consumed from the inbound queue
    routed: AtomicU64,
    /// Drops across all destinations
    dropped: AtomicU64,
    /// Submissions rejected at the inbound queue
    inbound_rejected: AtomicU64,
}

impl DistributorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routed(&self) -> u64 {
        self.routed.load(Ordering::Relaxed)
    }

    pub fn inc_routed(&self) {
        self.routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inbound_rejected(&self) -> u64 {
        self.inbound_rejected.load(Ordering::Relaxed)
    }

    pub fn inc_inbound_rejected(&self) {
        self.inbound_rejected.fetch_add(1, Ordering::Relaxed);
    }
}
