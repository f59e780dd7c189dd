//! MCP protocol client
//!
//! One `McpClient` instance represents one connection to one tool server
//! and provides request/response semantics over it. Requests travel as a
//! point-to-point POST whose response body carries the matching reply;
//! the pending-request table bounds how long a caller waits and supplies
//! a uniform timeout failure. The server-push SSE stream is a side
//! channel for unsolicited notifications only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::mcp::sse::SseFrameDecoder;
use crate::mcp::types::{
    methods, CallToolParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, RequestId, ServerMessage, Tool,
};

/// Pending requests keyed by correlation id. Each entry resolves exactly
/// once: response arrival, deadline expiry, or close, whichever removes
/// the entry first.
type PendingTable = Arc<Mutex<HashMap<String, oneshot::Sender<Result<Value, ClientError>>>>>;

/// Client for one MCP tool server
pub struct McpClient {
    /// Server label used in diagnostics
    name: String,

    /// Server base URL, no trailing slash
    base_url: String,

    /// HTTP client
    http: reqwest::Client,

    /// Fixed deadline for the health check and every request
    request_timeout: Duration,

    /// Connection state
    connected: bool,

    /// Per-instance request counter
    next_id: AtomicU64,

    /// In-flight requests
    pending: PendingTable,

    /// Cancellation signal for the background notification reader.
    /// Stays cancelled after close, which is what makes the instance
    /// single-use.
    cancel: CancellationToken,

    /// Background notification reader
    reader: Option<JoinHandle<()>>,
}

impl McpClient {
    /// Create an unconnected client for the server at `base_url`
    pub fn new(name: impl Into<String>, base_url: &str, request_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            request_timeout,
            connected: false,
            next_id: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(HashMap::new())),
            cancel: CancellationToken::new(),
            reader: None,
        }
    }

    /// Server label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pure connection-state query
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of in-flight requests
    pub fn pending_requests(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    fn messages_url(&self) -> String {
        format!("{}/sse/messages/", self.base_url)
    }

    fn sse_url(&self) -> String {
        format!("{}/sse/", self.base_url)
    }

    /// Connect to the server: health check, initialize handshake, then
    /// the background notification stream. On any failure the client is
    /// fully torn down before the error is returned.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.connected {
            return Err(ClientError::AlreadyConnected {
                server: self.name.clone(),
            });
        }
        if self.cancel.is_cancelled() {
            return Err(ClientError::Closed {
                server: self.name.clone(),
            });
        }

        info!(server = %self.name, url = %self.base_url, "connecting");

        if let Err(e) = self.establish().await {
            self.close().await;
            return Err(e);
        }

        self.connected = true;
        Ok(())
    }

    async fn establish(&mut self) -> Result<(), ClientError> {
        self.health_check().await?;
        self.initialize().await?;
        self.spawn_notification_reader();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ClientError> {
        let url = format!("{}/", self.base_url);
        let response = tokio::time::timeout(self.request_timeout, self.http.get(&url).send())
            .await
            .map_err(|_| ClientError::Timeout {
                timeout: self.request_timeout,
            })?
            .map_err(|e| ClientError::HealthCheck {
                server: self.name.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ClientError::HealthCheck {
                server: self.name.clone(),
                message: format!("status {}", response.status()),
            });
        }

        Ok(())
    }

    async fn initialize(&self) -> Result<(), ClientError> {
        let params = serde_json::to_value(InitializeParams::default()).map_err(|e| {
            ClientError::Transport {
                message: e.to_string(),
            }
        })?;

        let result = self
            .send_request(methods::INITIALIZE, params)
            .await
            .map_err(|e| match e {
                ClientError::Rpc { .. } => ClientError::Initialize {
                    server: self.name.clone(),
                    message: e.to_string(),
                },
                other => other,
            })?;

        let init: InitializeResult = serde_json::from_value(result).unwrap_or_default();
        info!(
            server = %self.name,
            server_name = %init.server_info.name,
            server_version = %init.server_info.version,
            "connected"
        );

        Ok(())
    }

    /// Discover the tools advertised by the server
    pub async fn list_tools(&self) -> Result<Vec<Tool>, ClientError> {
        self.ensure_connected()?;

        let result = self
            .send_request(methods::LIST_TOOLS, serde_json::json!({}))
            .await?;

        let parsed: ListToolsResult =
            serde_json::from_value(result).map_err(|e| ClientError::Transport {
                message: format!("malformed tools/list result: {e}"),
            })?;

        Ok(parsed.tools)
    }

    /// Invoke a tool by name; returns the raw result payload unchanged
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ClientError> {
        self.ensure_connected()?;

        debug!(server = %self.name, tool = name, "calling tool");

        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let params = serde_json::to_value(params).map_err(|e| ClientError::Transport {
            message: e.to_string(),
        })?;

        self.send_request(methods::CALL_TOOL, params).await
    }

    /// Tear down the client: cancel the notification reader, reject every
    /// in-flight request, and reset state. Safe to call at any point, any
    /// number of times; the instance cannot reconnect afterwards.
    pub async fn close(&mut self) {
        self.cancel.cancel();

        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }

        let drained: Vec<_> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().collect()
        };
        for (_, tx) in drained {
            let _ = tx.send(Err(ClientError::ConnectionClosed));
        }

        self.connected = false;
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.connected {
            Ok(())
        } else {
            Err(ClientError::NotConnected {
                server: self.name.clone(),
            })
        }
    }

    /// Mint a correlation id unique within this instance's lifetime
    fn next_request_id(&self) -> String {
        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        format!("{seq}-{millis}")
    }

    /// Send one JSON-RPC request and wait for its reply under the fixed
    /// deadline. The POST runs in a spawned task that resolves the
    /// pending entry on completion; whichever of reply, deadline, or
    /// close removes the entry first is the single outcome.
    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_request_id();
        let request = JsonRpcRequest::new(RequestId::String(id.clone()), method, params);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id.clone(), tx);

        let http = self.http.clone();
        let url = self.messages_url();
        let pending = Arc::clone(&self.pending);
        let correlation = id.clone();
        tokio::spawn(async move {
            let outcome = exchange(&http, &url, &request).await;
            let slot = pending.lock().unwrap().remove(&correlation);
            if let Some(tx) = slot {
                let _ = tx.send(outcome);
            }
        });

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(ClientError::Timeout {
                    timeout: self.request_timeout,
                })
            }
        }
    }

    /// Open the server-push stream in the background. Fire-and-forget:
    /// connection readiness does not wait on it, and its loss does not
    /// affect the request path.
    fn spawn_notification_reader(&mut self) {
        let http = self.http.clone();
        let url = self.sse_url();
        let cancel = self.cancel.clone();
        let server = self.name.clone();

        self.reader = Some(tokio::spawn(async move {
            run_notification_reader(http, url, cancel, server).await;
        }));
    }
}

/// Perform one point-to-point JSON-RPC exchange
async fn exchange(
    http: &reqwest::Client,
    url: &str,
    request: &JsonRpcRequest,
) -> Result<Value, ClientError> {
    let response = http
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(|e| ClientError::Transport {
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(ClientError::Transport {
            message: format!("unexpected status {}", response.status()),
        });
    }

    let decoded: JsonRpcResponse =
        response.json().await.map_err(|e| ClientError::Transport {
            message: format!("malformed response body: {e}"),
        })?;

    if decoded.id != request.id {
        return Err(ClientError::Transport {
            message: format!("response does not match request id {:?}", request.id),
        });
    }

    if let Some(err) = decoded.error {
        return Err(ClientError::Rpc {
            code: err.code,
            message: err.diagnostic(),
        });
    }

    Ok(decoded.result.unwrap_or(Value::Null))
}

/// Read the SSE notification stream until cancelled or the stream ends.
/// Frames are decoded and logged; undecodable frames are dropped with a
/// diagnostic. No response payload is ever delivered through here.
async fn run_notification_reader(
    http: reqwest::Client,
    url: String,
    cancel: CancellationToken,
    server: String,
) {
    let response = tokio::select! {
        _ = cancel.cancelled() => return,
        res = http.get(&url).send() => match res {
            Ok(r) => r,
            Err(e) => {
                warn!(server = %server, error = %e, "notification stream unavailable");
                return;
            }
        },
    };

    if !response.status().is_success() {
        warn!(
            server = %server,
            status = %response.status(),
            "notification stream rejected"
        );
        return;
    }

    let mut stream = response.bytes_stream();
    let mut decoder = SseFrameDecoder::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for frame in decoder.push(&String::from_utf8_lossy(&bytes)) {
                        handle_frame(&server, &frame);
                    }
                }
                Some(Err(e)) => {
                    warn!(server = %server, error = %e, "notification stream read failed");
                    break;
                }
                None => {
                    debug!(server = %server, "notification stream ended");
                    break;
                }
            },
        }
    }
}

fn handle_frame(server: &str, frame: &str) {
    match serde_json::from_str::<ServerMessage>(frame) {
        Ok(ServerMessage::Notification(n)) => {
            info!(server = %server, method = %n.method, "server notification");
        }
        Ok(ServerMessage::Response(_)) => {
            debug!(server = %server, "ignoring response frame on notification stream");
        }
        Err(e) => {
            warn!(server = %server, error = %e, "dropping undecodable frame");
        }
    }
}
