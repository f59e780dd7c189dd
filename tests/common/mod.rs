//! In-process mock MCP tool servers for integration tests.
//!
//! Each server speaks the same wire protocol as a real tool server:
//! health on `/`, JSON-RPC over `POST /sse/messages/`, notifications on
//! `GET /sse/`. Behavior is configured per test through the builder.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// Outcome of one mocked tool call
pub struct CallReply {
    pub delay: Duration,
    pub result: Result<Value, (i64, String, Option<Value>)>,
}

impl CallReply {
    pub fn ok(payload: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(payload),
        }
    }

    pub fn ok_after(delay: Duration, payload: Value) -> Self {
        Self {
            delay,
            result: Ok(payload),
        }
    }

    pub fn err(code: i64, message: &str, data: Option<Value>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err((code, message.to_string(), data)),
        }
    }
}

type CallHandler = dyn Fn(&str, &Value) -> CallReply + Send + Sync;

struct MockState {
    name: String,
    health_status: StatusCode,
    init_error: Option<(i64, String)>,
    tools_result: Value,
    hang_methods: Vec<String>,
    on_call: Arc<CallHandler>,
}

pub struct MockToolServerBuilder {
    state: MockState,
}

impl MockToolServerBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            state: MockState {
                name: name.to_string(),
                health_status: StatusCode::OK,
                init_error: None,
                tools_result: json!({ "tools": [] }),
                hang_methods: Vec::new(),
                on_call: Arc::new(|name, _| {
                    CallReply::err(
                        -32601,
                        "Method not found",
                        Some(json!(format!("Unknown tool: {name}"))),
                    )
                }),
            },
        }
    }

    /// Respond to health checks with this status instead of 200
    pub fn health_status(mut self, status: StatusCode) -> Self {
        self.state.health_status = status;
        self
    }

    /// Reject initialize with a JSON-RPC error
    pub fn init_error(mut self, code: i64, message: &str) -> Self {
        self.state.init_error = Some((code, message.to_string()));
        self
    }

    /// Raw `tools/list` result value
    pub fn tools_result(mut self, result: Value) -> Self {
        self.state.tools_result = result;
        self
    }

    /// Never answer requests for this method
    pub fn hang_on(mut self, method: &str) -> Self {
        self.state.hang_methods.push(method.to_string());
        self
    }

    pub fn on_call<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Value) -> CallReply + Send + Sync + 'static,
    {
        self.state.on_call = Arc::new(handler);
        self
    }

    pub async fn spawn(self) -> MockToolServer {
        let state = Arc::new(self.state);
        let app = Router::new()
            .route("/", get(health))
            .route("/sse/", get(notifications))
            .route("/sse/messages/", post(messages))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock server");
        });

        MockToolServer {
            url: format!("http://{addr}"),
            addr,
            handle,
        }
    }
}

pub struct MockToolServer {
    pub url: String,
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Drop for MockToolServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn health(State(state): State<Arc<MockState>>) -> Response {
    if state.health_status != StatusCode::OK {
        return (state.health_status, "unhealthy").into_response();
    }
    Json(json!({
        "name": state.name,
        "version": "1.0.0",
        "status": "running",
    }))
    .into_response()
}

async fn notifications() -> Response {
    let frame = "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n\n";
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        frame.to_string(),
    )
        .into_response()
}

async fn messages(State(state): State<Arc<MockState>>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();

    if state.hang_methods.contains(&method) {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }

    let response = match method.as_str() {
        "initialize" => match &state.init_error {
            Some((code, message)) => rpc_error(id, *code, message, None),
            None => rpc_result(
                id,
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": { "name": state.name, "version": "1.0.0" },
                }),
            ),
        },
        "tools/list" => rpc_result(id, state.tools_result.clone()),
        "tools/call" => {
            let name = request["params"]["name"].as_str().unwrap_or_default();
            let arguments = &request["params"]["arguments"];
            let reply = (state.on_call)(name, arguments);
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            match reply.result {
                Ok(payload) => rpc_result(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": payload.to_string() }],
                    }),
                ),
                Err((code, message, data)) => rpc_error(id, code, &message, data),
            }
        }
        _ => rpc_error(
            id,
            -32601,
            "Method not found",
            Some(json!(format!("Unknown method: {method}"))),
        ),
    };

    Json(response)
}

fn rpc_result(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, message: &str, data: Option<Value>) -> Value {
    let mut error = json!({ "code": code, "message": message });
    if let Some(data) = data {
        error["data"] = data;
    }
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

/// Mock CRM server: `getCustomerEmail` keyed by order id, mirroring the
/// reference server's data set and error shapes.
pub async fn spawn_crm_server() -> MockToolServer {
    MockToolServerBuilder::new("crm-server")
        .tools_result(json!({
            "tools": [{
                "name": "getCustomerEmail",
                "description": "Get customer email address by order ID",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "order_id": { "type": "string", "description": "The order ID to look up" }
                    },
                    "required": ["order_id"]
                }
            }]
        }))
        .on_call(|name, arguments| {
            if name != "getCustomerEmail" {
                return CallReply::err(
                    -32601,
                    "Method not found",
                    Some(json!(format!("Unknown tool: {name}"))),
                );
            }
            let order_id = arguments["order_id"].as_str().unwrap_or_default();
            match order_id {
                "XYZ-789" => CallReply::ok(json!({ "email": "alice@example.com" })),
                "ABC-123" => CallReply::ok(json!({ "email": "bob@example.com" })),
                "EMPTY-1" => CallReply::ok(json!({})),
                _ => CallReply::err(
                    -32603,
                    "Order not found",
                    Some(json!(format!("No customer found for order_id: {order_id}"))),
                ),
            }
        })
        .spawn()
        .await
}

/// Mock email server: `sendShippingConfirmation` acknowledging the send.
pub async fn spawn_email_server() -> MockToolServer {
    MockToolServerBuilder::new("email-server")
        .tools_result(json!({
            "tools": [{
                "name": "sendShippingConfirmation",
                "description": "Send shipping confirmation email to customer",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "email": { "type": "string" },
                        "order_details": {
                            "type": "object",
                            "properties": { "order_id": { "type": "string" } },
                            "required": ["order_id"]
                        }
                    },
                    "required": ["email", "order_details"]
                }
            }]
        }))
        .on_call(|name, arguments| {
            if name != "sendShippingConfirmation" {
                return CallReply::err(
                    -32601,
                    "Method not found",
                    Some(json!(format!("Unknown tool: {name}"))),
                );
            }
            let email = arguments["email"].as_str().unwrap_or_default();
            let order_id = arguments["order_details"]["order_id"]
                .as_str()
                .unwrap_or_default();
            if email.is_empty() {
                return CallReply::err(-32602, "Invalid params", Some(json!("email is required")));
            }
            CallReply::ok(json!({
                "ok": true,
                "message": format!("Sent confirmation to {email} for order {order_id}"),
            }))
        })
        .spawn()
        .await
}

/// An address with no listener behind it
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}")
}
