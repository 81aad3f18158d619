//! # ucistage RPC
//!
//! Client side of the ubus JSON-RPC gateway used to reach the remote UCI
//! configuration store.
//!
//! ## Architecture
//!
//! - **Protocol Layer**: JSON-RPC 2.0 envelope types and ubus `call` framing
//! - **Transport Layer**: line-delimited streams and HTTP POST
//! - **Client Layer**: [`UbusClient`], which implements the [`Rpc`] trait the
//!   configuration engine consumes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ucistage_rpc::{HttpTransport, Rpc, UbusClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new("http://192.168.1.1/ubus")?;
//!     let client = UbusClient::new(transport);
//!
//!     let reply = client.call("uci", "get", json!({ "config": "network" })).await?;
//!     println!("{:?}", reply.expect("values")?);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod jsonrpc;
pub mod transport;

pub use client::{Reply, Rpc, UbusClient, ANONYMOUS_SESSION};
pub use error::{Result, RpcError};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, UbusStatus};
pub use transport::{HttpTransport, StreamTransport, Transport};
