//! Error types for the configuration store

use thiserror::Error;
use ucistage_rpc::{RpcError, UbusStatus};

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration store errors
#[derive(Debug, Error)]
pub enum Error {
    /// Remote call failed
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// The apply call itself returned a non-zero status
    #[error("Apply rejected: {0}")]
    ApplyRejected(UbusStatus),

    /// No confirm call succeeded before the rollback deadline
    #[error("Changes not confirmed before the deadline, last status: {status}")]
    ConfirmTimeout {
        /// Status of the last confirm attempt
        status: UbusStatus,
    },

    /// Apply/confirm was cancelled by the caller
    #[error("Apply cancelled before confirmation")]
    Cancelled,

    /// Malformed local configuration data
    #[error("Invalid configuration data: {0}")]
    InvalidData(String),

    /// Settings file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// ubus status carried by the error, if any
    pub fn status(&self) -> Option<UbusStatus> {
        match self {
            Error::ApplyRejected(status) | Error::ConfirmTimeout { status } => Some(*status),
            Error::Rpc(RpcError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}
