//! Error types for ubus RPC calls

use crate::jsonrpc::{JsonRpcError, UbusStatus};
use thiserror::Error;

/// Result type for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;

/// RPC client errors
///
/// Every variant carries owned, cloneable data so a single failure can be
/// handed to every waiter of a shared in-flight call.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// I/O failure on the underlying transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Peer closed the stream before answering
    #[error("Connection closed by peer")]
    Closed,

    /// HTTP-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(String),

    /// Session token rejected or expired
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// JSON-RPC error object returned by the gateway
    #[error("JSON-RPC error {code}: {message}")]
    Remote {
        /// JSON-RPC error code
        code: i32,
        /// Error message
        message: String,
    },

    /// ubus call completed with a non-zero status
    #[error("ubus call {object}.{method} failed: {status}")]
    Status {
        /// ubus object
        object: String,
        /// ubus method
        method: String,
        /// Returned status
        status: UbusStatus,
    },

    /// Reply did not have the expected shape
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl RpcError {
    /// Map a JSON-RPC error object to a client error
    pub fn from_jsonrpc(error: JsonRpcError) -> Self {
        if error.is_access_denied() {
            RpcError::AccessDenied(error.message)
        } else {
            RpcError::Remote {
                code: error.code,
                message: error.message,
            }
        }
    }

    /// Whether the error means the session must be renewed
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            RpcError::AccessDenied(_)
                | RpcError::Status {
                    status: UbusStatus::PermissionDenied,
                    ..
                }
        )
    }
}

impl From<std::io::Error> for RpcError {
    fn from(e: std::io::Error) -> Self {
        RpcError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_mapping() {
        let err = RpcError::from_jsonrpc(JsonRpcError::new(-32002, "Access denied"));
        assert!(err.is_access_denied());
        assert!(err.to_string().contains("Access denied"));
    }

    #[test]
    fn test_remote_error_mapping() {
        let err = RpcError::from_jsonrpc(JsonRpcError::new(-32601, "Method not found"));
        assert!(!err.is_access_denied());
        assert!(matches!(err, RpcError::Remote { code: -32601, .. }));
    }

    #[test]
    fn test_status_error_display() {
        let err = RpcError::Status {
            object: "uci".to_string(),
            method: "get".to_string(),
            status: UbusStatus::NotFound,
        };
        assert_eq!(err.to_string(), "ubus call uci.get failed: Resource not found (4)");
    }
}
