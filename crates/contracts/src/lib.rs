//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data Model
//! - `MetricBatch` flows from ingress through the distributor into destination queues
//! - Lines are opaque text; the engine never parses or translates them

mod batch;
mod config;
mod error;
mod stats;
mod transport;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use stats::*;
pub use transport::{LocalTransport, Transport};
