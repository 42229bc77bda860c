//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// No config file and no inline destinations
    #[error("No configuration: pass --config, --destinations or --console-out")]
    ConfigRequired,

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid command-line override
    #[error("Invalid value for --{flag}: {message}")]
    InvalidOverride { flag: String, message: String },

    /// Config loading or validation error
    #[error(transparent)]
    Config(#[from] ContractError),

    /// Ingress listener could not bind
    #[error("Failed to listen on {address}: {source}")]
    Listen {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_override(flag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            flag: flag.into(),
            message: message.into(),
        }
    }

    pub fn listen(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Listen {
            address: address.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
