//! JSON-RPC 2.0 protocol types
//!
//! The ubus gateway speaks JSON-RPC 2.0 with a single interesting method,
//! `call`, whose positional params are `[session, object, method, args]` and
//! whose result is `[status]` or `[status, data]`.

use crate::error::{Result, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Request ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Method name
    pub method: String,

    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Create a ubus `call` request
    pub fn call(id: RequestId, session: &str, object: &str, method: &str, args: Value) -> Self {
        Self::new(
            id,
            "call",
            Some(serde_json::json!([session, object, method, args])),
        )
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Request ID (same as request, or null for error before ID was extracted)
    pub id: Option<RequestId>,

    /// Result (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Split a ubus `call` result into its status code and optional data
    pub fn into_ubus_result(self) -> Result<(UbusStatus, Option<Value>)> {
        if let Some(error) = self.error {
            return Err(RpcError::from_jsonrpc(error));
        }

        let result = self
            .result
            .ok_or_else(|| RpcError::UnexpectedReply("Missing result".to_string()))?;

        let mut items = match result {
            Value::Array(items) => items,
            other => {
                return Err(RpcError::UnexpectedReply(format!(
                    "Expected [status, data], got {}",
                    other
                )))
            }
        };

        if items.is_empty() {
            return Err(RpcError::UnexpectedReply("Empty result array".to_string()));
        }

        let data = if items.len() > 1 {
            Some(items.swap_remove(1))
        } else {
            None
        };

        let status = items[0]
            .as_i64()
            .ok_or_else(|| RpcError::UnexpectedReply(format!("Invalid status {}", items[0])))?;

        Ok((UbusStatus::from(status), data))
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,

    /// Error message
    pub message: String,

    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Code the ubus gateway uses when the session lacks access
    pub const ACCESS_DENIED: i32 = -32002;

    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Whether the gateway rejected the session
    pub fn is_access_denied(&self) -> bool {
        self.code == Self::ACCESS_DENIED
    }
}

/// Request/Response ID (can be string or number)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String ID
    String(String),
    /// Numeric ID
    Number(i64),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// ubus call status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UbusStatus {
    Ok,
    InvalidCommand,
    InvalidArgument,
    MethodNotFound,
    NotFound,
    NoData,
    PermissionDenied,
    Timeout,
    NotSupported,
    UnknownError,
    ConnectionFailed,
    /// Code outside the range ubus defines
    Other(i64),
}

impl UbusStatus {
    /// Numeric status code
    pub fn code(&self) -> i64 {
        match self {
            UbusStatus::Ok => 0,
            UbusStatus::InvalidCommand => 1,
            UbusStatus::InvalidArgument => 2,
            UbusStatus::MethodNotFound => 3,
            UbusStatus::NotFound => 4,
            UbusStatus::NoData => 5,
            UbusStatus::PermissionDenied => 6,
            UbusStatus::Timeout => 7,
            UbusStatus::NotSupported => 8,
            UbusStatus::UnknownError => 9,
            UbusStatus::ConnectionFailed => 10,
            UbusStatus::Other(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == UbusStatus::Ok
    }

    fn description(&self) -> &'static str {
        match self {
            UbusStatus::Ok => "Command OK",
            UbusStatus::InvalidCommand => "Invalid command",
            UbusStatus::InvalidArgument => "Invalid argument",
            UbusStatus::MethodNotFound => "Method not found",
            UbusStatus::NotFound => "Resource not found",
            UbusStatus::NoData => "No data received",
            UbusStatus::PermissionDenied => "Permission denied",
            UbusStatus::Timeout => "Request timeout",
            UbusStatus::NotSupported => "Not supported",
            UbusStatus::UnknownError => "Unspecified error",
            UbusStatus::ConnectionFailed => "Connection lost",
            UbusStatus::Other(_) => "Unknown status",
        }
    }
}

impl From<i64> for UbusStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => UbusStatus::Ok,
            1 => UbusStatus::InvalidCommand,
            2 => UbusStatus::InvalidArgument,
            3 => UbusStatus::MethodNotFound,
            4 => UbusStatus::NotFound,
            5 => UbusStatus::NoData,
            6 => UbusStatus::PermissionDenied,
            7 => UbusStatus::Timeout,
            8 => UbusStatus::NotSupported,
            9 => UbusStatus::UnknownError,
            10 => UbusStatus::ConnectionFailed,
            other => UbusStatus::Other(other),
        }
    }
}

impl std::fmt::Display for UbusStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_serialization() {
        let req = JsonRpcRequest::call(
            RequestId::Number(7),
            "0123",
            "uci",
            "get",
            json!({"config": "network"}),
        );

        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"call\""));
        assert!(json.contains("\"id\":7"));
        assert!(json.contains("[\"0123\",\"uci\",\"get\",{\"config\":\"network\"}]"));
    }

    #[test]
    fn test_ubus_result_with_data() {
        let resp = JsonRpcResponse::success(RequestId::Number(1), json!([0, {"section": "cfg01"}]));
        let (status, data) = resp.into_ubus_result().unwrap();

        assert!(status.is_ok());
        assert_eq!(data, Some(json!({"section": "cfg01"})));
    }

    #[test]
    fn test_ubus_result_status_only() {
        let resp = JsonRpcResponse::success(RequestId::Number(1), json!([4]));
        let (status, data) = resp.into_ubus_result().unwrap();

        assert_eq!(status, UbusStatus::NotFound);
        assert!(data.is_none());
    }

    #[test]
    fn test_ubus_result_error_object() {
        let resp = JsonRpcResponse::error(
            Some(RequestId::Number(1)),
            JsonRpcError::new(JsonRpcError::ACCESS_DENIED, "Access denied"),
        );

        let err = resp.into_ubus_result().unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_ubus_result_malformed() {
        let resp = JsonRpcResponse::success(RequestId::Number(1), json!({"status": 0}));
        assert!(matches!(
            resp.into_ubus_result(),
            Err(RpcError::UnexpectedReply(_))
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(UbusStatus::from(6), UbusStatus::PermissionDenied);
        assert_eq!(UbusStatus::from(42), UbusStatus::Other(42));
        assert_eq!(UbusStatus::Other(42).code(), 42);
        assert_eq!(UbusStatus::Timeout.to_string(), "Request timeout (7)");
    }
}
