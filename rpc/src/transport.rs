//! Transports for JSON-RPC messages
//!
//! [`StreamTransport`] speaks line-delimited JSON over any byte stream (a
//! child process bridging to ubus, a socket, an in-memory duplex in tests).
//! Each message is a single line of JSON terminated by a newline.
//! [`HttpTransport`] posts each request to the ubus JSON-RPC endpoint of a
//! web server.

use crate::error::{Result, RpcError};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// A request/response exchange with the ubus gateway
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for its response
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse>;
}

struct StreamHalves<R, W> {
    reader: BufReader<R>,
    writer: W,
}

/// Line-delimited JSON transport over a byte stream
///
/// Requests are serialized one at a time; a response is read before the
/// next request is written.
pub struct StreamTransport<R, W> {
    halves: Mutex<StreamHalves<R, W>>,
    bridge: Option<Child>,
}

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a transport over a reader/writer pair
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            halves: Mutex::new(StreamHalves {
                reader: BufReader::new(reader),
                writer,
            }),
            bridge: None,
        }
    }

    /// Process id of the spawned bridge, if any
    pub fn bridge_pid(&self) -> Option<u32> {
        self.bridge.as_ref().and_then(|child| child.id())
    }

    async fn read_response(reader: &mut BufReader<R>) -> Result<JsonRpcResponse> {
        loop {
            let mut line = String::new();

            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(RpcError::Closed);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str(trimmed).map_err(|e| {
                error!(error = %e, line = %trimmed, "Failed to parse JSON-RPC response");
                RpcError::from(e)
            });
        }
    }
}

impl StreamTransport<ChildStdout, ChildStdin> {
    /// Spawn a bridge process and talk to it over its stdin/stdout
    ///
    /// The process is killed when the transport is dropped.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RpcError::Transport("Bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RpcError::Transport("Bridge stdout unavailable".to_string()))?;

        debug!(program, "Spawned ubus bridge");

        let mut transport = Self::new(stdout, stdin);
        transport.bridge = Some(child);
        Ok(transport)
    }
}

#[async_trait]
impl<R, W> Transport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let json = serde_json::to_string(request)?;
        let mut halves = self.halves.lock().await;

        debug!(request = %json, "Sending JSON-RPC request");

        halves.writer.write_all(json.as_bytes()).await?;
        halves.writer.write_all(b"\n").await?;
        halves.writer.flush().await?;

        let response = Self::read_response(&mut halves.reader).await?;

        if response.id.is_some() && response.id != request.id {
            return Err(RpcError::UnexpectedReply(format!(
                "Response id {:?} does not match request id {:?}",
                response.id, request.id
            )));
        }

        debug!(response = ?response, "Received JSON-RPC response");
        Ok(response)
    }
}

/// HTTP transport posting to a ubus JSON-RPC endpoint
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a transport for the given endpoint URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Self::DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        debug!(url = %self.url, method = %request.method, "Posting JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<JsonRpcResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::RequestId;
    use serde_json::json;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_stream_roundtrip() {
        let (client_side, server_side) = duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (server_read, mut server_write) = tokio::io::split(server_side);

        let server = tokio::spawn(async move {
            let mut reader = BufReader::new(server_read);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();

            let request: JsonRpcRequest = serde_json::from_str(line.trim()).unwrap();
            assert_eq!(request.method, "call");

            let response = JsonRpcResponse::success(request.id.unwrap(), json!([0, {"ok": true}]));
            let mut out = serde_json::to_string(&response).unwrap();
            out.push('\n');
            server_write.write_all(out.as_bytes()).await.unwrap();
        });

        let transport = StreamTransport::new(client_read, client_write);
        let request = JsonRpcRequest::call(RequestId::Number(1), "s", "uci", "changes", json!({}));
        let response = transport.send(&request).await.unwrap();

        assert_eq!(response.id, Some(RequestId::Number(1)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_stream_closed() {
        let (client_side, server_side) = duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_side);
        drop(server_side);

        let transport = StreamTransport::new(client_read, client_write);
        let request = JsonRpcRequest::call(RequestId::Number(1), "s", "uci", "changes", json!({}));

        assert!(transport.send(&request).await.is_err());
    }
}
