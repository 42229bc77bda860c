//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// No destinations configured
    #[error("destination pool is empty")]
    EmptyPool,

    /// Same address registered twice
    #[error("destination '{address}' registered more than once")]
    DuplicateDestination { address: String },

    /// Address is not `host:port`
    #[error("invalid destination address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    /// Inbound queue full - submission rejected
    #[error("inbound queue full, batch of {lines} lines rejected")]
    InboundFull { lines: usize },

    /// Distributor gone
    #[error("inbound queue closed")]
    InboundClosed,

    /// Contract error (config, transport)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create an invalid address error
    pub fn invalid_address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.into(),
        }
    }
}
