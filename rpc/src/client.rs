//! ubus client
//!
//! [`UbusClient`] wraps a [`Transport`] with request id allocation and the
//! session token every ubus call carries, and exposes the [`Rpc`] trait.

use crate::error::{Result, RpcError};
use crate::jsonrpc::{JsonRpcRequest, RequestId, UbusStatus};
use crate::transport::Transport;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, warn};

/// Session token used before login
pub const ANONYMOUS_SESSION: &str = "00000000000000000000000000000000";

/// Outcome of a single ubus call
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// ubus status
    pub status: UbusStatus,
    /// Returned data, if any
    pub data: Option<Value>,
}

impl Reply {
    /// Create a reply
    pub fn new(status: UbusStatus, data: Option<Value>) -> Self {
        Self { status, data }
    }

    /// Successful reply carrying data
    pub fn ok(data: Value) -> Self {
        Self::new(UbusStatus::Ok, Some(data))
    }

    /// Reply with a bare status code
    pub fn status(code: i64) -> Self {
        Self::new(UbusStatus::from(code), None)
    }

    /// Extract a top-level field of the returned data
    ///
    /// A missing data object yields `Value::Null`, mirroring an empty reply.
    pub fn expect(&self, key: &str) -> Result<Value> {
        match &self.data {
            None => Ok(Value::Null),
            Some(Value::Object(map)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
            Some(other) => Err(RpcError::UnexpectedReply(format!(
                "Expected object with '{}', got {}",
                key, other
            ))),
        }
    }

    /// Turn a non-zero status into an error
    pub fn reject_nonzero(self, object: &str, method: &str) -> Result<Self> {
        if self.status.is_ok() {
            Ok(self)
        } else {
            Err(RpcError::Status {
                object: object.to_string(),
                method: method.to_string(),
                status: self.status,
            })
        }
    }
}

/// Remote procedure call primitive consumed by the configuration engine
#[async_trait]
pub trait Rpc: Send + Sync {
    /// Invoke `object.method` with the given arguments
    ///
    /// Only transport and protocol failures are errors; a non-zero ubus
    /// status is returned in the [`Reply`].
    async fn call(&self, object: &str, method: &str, args: Value) -> Result<Reply>;
}

#[async_trait]
impl<T: Rpc + ?Sized> Rpc for Box<T> {
    async fn call(&self, object: &str, method: &str, args: Value) -> Result<Reply> {
        (**self).call(object, method, args).await
    }
}

#[async_trait]
impl<T: Rpc + ?Sized> Rpc for std::sync::Arc<T> {
    async fn call(&self, object: &str, method: &str, args: Value) -> Result<Reply> {
        (**self).call(object, method, args).await
    }
}

/// ubus JSON-RPC client
pub struct UbusClient<T> {
    transport: T,
    session: RwLock<String>,
    next_id: AtomicI64,
}

impl<T: Transport> UbusClient<T> {
    /// Create a client using the anonymous session
    pub fn new(transport: T) -> Self {
        Self::with_session(transport, ANONYMOUS_SESSION)
    }

    /// Create a client with an existing session token
    pub fn with_session(transport: T, session: impl Into<String>) -> Self {
        Self {
            transport,
            session: RwLock::new(session.into()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Current session token
    pub fn session(&self) -> String {
        self.session.read().clone()
    }

    /// Replace the session token used for subsequent calls
    pub fn set_session(&self, session: impl Into<String>) {
        *self.session.write() = session.into();
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: Transport> Rpc for UbusClient<T> {
    async fn call(&self, object: &str, method: &str, args: Value) -> Result<Reply> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::call(
            RequestId::Number(id),
            &self.session(),
            object,
            method,
            args,
        );

        debug!(id, object, method, "ubus call");

        let response = self.transport.send(&request).await?;
        let (status, data) = response.into_ubus_result().map_err(|e| {
            if e.is_access_denied() {
                warn!(object, method, "Session rejected by ubus gateway");
            }
            e
        })?;

        Ok(Reply::new(status, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{JsonRpcError, JsonRpcResponse};
    use serde_json::json;
    use std::sync::Mutex;

    /// Transport answering every request with a canned result
    struct CannedTransport {
        result: Value,
        seen: Mutex<Vec<JsonRpcRequest>>,
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, request: &JsonRpcRequest) -> Result<crate::JsonRpcResponse> {
            self.seen.lock().unwrap().push(request.clone());
            if self.result.is_null() {
                return Ok(JsonRpcResponse::error(
                    request.id.clone(),
                    JsonRpcError::new(JsonRpcError::ACCESS_DENIED, "Access denied"),
                ));
            }
            Ok(JsonRpcResponse::success(
                request.id.clone().unwrap(),
                self.result.clone(),
            ))
        }
    }

    fn canned(result: Value) -> UbusClient<CannedTransport> {
        UbusClient::new(CannedTransport {
            result,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_call_carries_session_and_ids() {
        let client = canned(json!([0, {"section": "cfg0a"}]));
        client.set_session("abc");

        let reply = client.call("uci", "add", json!({"config": "network"})).await.unwrap();
        assert_eq!(reply.expect("section").unwrap(), json!("cfg0a"));

        client.call("uci", "changes", json!({})).await.unwrap();

        let seen = client.transport().seen.lock().unwrap();
        assert_eq!(seen[0].params.as_ref().unwrap()[0], json!("abc"));
        assert_eq!(seen[0].id, Some(RequestId::Number(1)));
        assert_eq!(seen[1].id, Some(RequestId::Number(2)));
    }

    #[tokio::test]
    async fn test_nonzero_status_is_not_an_error() {
        let client = canned(json!([5]));
        let reply = client.call("uci", "confirm", json!({})).await.unwrap();

        assert_eq!(reply.status, UbusStatus::NoData);
        assert!(reply.clone().reject_nonzero("uci", "confirm").is_err());
    }

    #[tokio::test]
    async fn test_access_denied() {
        let client = canned(Value::Null);
        let err = client.call("uci", "get", json!({})).await.unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_expect_missing_data() {
        assert_eq!(Reply::status(0).expect("values").unwrap(), Value::Null);
        assert!(Reply::ok(json!([1, 2])).expect("values").is_err());
    }
}
