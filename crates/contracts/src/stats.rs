//! Stats snapshots - engine output for scraping/reporting

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a destination's delivery task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationStats {
    pub address: String,
    pub state: ConnectionState,
    pub last_error: Option<String>,
    /// Batches admitted to the outbound queue
    pub accepted: u64,
    /// Batches fully written to the socket
    pub sent: u64,
    /// Lines fully written to the socket
    pub sent_lines: u64,
    /// Batches rejected because the queue was full
    pub dropped: u64,
    /// Batches lost in flight on a write failure
    pub lost: u64,
    pub write_errors: u64,
    pub connect_failures: u64,
    /// Successful dials after the first one
    pub reconnects: u64,
    pub queue_len: usize,
}

/// Point-in-time view of the whole pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Batches consumed from the inbound queue
    pub routed: u64,
    /// Drops across all destinations
    pub dropped: u64,
    /// Submissions refused because the inbound queue was full
    pub inbound_rejected: u64,
    pub destinations: Vec<DestinationStats>,
}

impl PoolSnapshot {
    /// Destinations currently holding a live connection
    pub fn connected(&self) -> usize {
        self.destinations
            .iter()
            .filter(|d| d.state == ConnectionState::Connected)
            .count()
    }

    pub fn destination(&self, address: &str) -> Option<&DestinationStats> {
        self.destinations.iter().find(|d| d.address == address)
    }
}
