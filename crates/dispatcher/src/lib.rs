//! # Dispatcher
//!
//! Output distribution engine.
//!
//! Responsible for:
//! - Consuming `MetricBatch` from the single inbound queue
//! - Routing each batch by policy (broadcast / hash-route)
//! - One bounded queue and delivery task per destination, so a slow or
//!   dead destination never blocks ingestion or its peers

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod backoff;
pub mod destination;
pub mod distributor;
pub mod error;
pub mod ingress;
pub mod metrics;
pub mod policy;
pub mod pool;
pub mod transport;

pub use contracts::{MetricBatch, Transport};
pub use destination::{Destination, DestinationStatus, EnqueueOutcome};
pub use distributor::{create_distributor, Distributor, DistributorBuilder, CONSOLE_DESTINATION};
pub use error::DispatcherError;
pub use ingress::IngressHandle;
pub use metrics::{DestinationMetrics, DistributorMetrics};
pub use policy::{tenant_key, DistributionPolicy, KeyFn};
pub use pool::Pool;
pub use transport::{ConsoleTransport, TcpTransport};
