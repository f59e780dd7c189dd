//! Workflow event relay
//!
//! Adapts an inbound one-shot request into a workflow run and
//! re-publishes the run's progress events to the caller over a
//! server-sent event stream, one frame per event.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::workflow::events::ProgressEvent;
use crate::workflow::orchestrator::OrderWorkflow;

/// Channel capacity between the orchestrator and the outbound stream
const EVENT_BUFFER: usize = 16;

/// Build the relay router
pub fn router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/workflows/orders", post(process_order))
        .with_state(config)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "name": "ops-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// Workflow request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessOrderRequest {
    order_id: String,
}

/// Accept one order workflow request. Input is validated before any
/// stream exists; an accepted request opens exactly one event stream.
async fn process_order(
    State(config): State<Arc<Config>>,
    Json(request): Json<ProcessOrderRequest>,
) -> Response {
    let order_id = request.order_id.trim().to_string();
    if order_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "orderId must not be empty" })),
        )
            .into_response();
    }

    info!(order_id = %order_id, "accepted workflow request");

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        // The run holds the only sender; when it returns (or panics),
        // the sender drops and the outbound stream ends.
        OrderWorkflow::new((*config).clone(), tx).run(&order_id).await;
    });

    sse_response(rx)
}

/// Frame each progress event as `data: <json>` followed by a blank line,
/// flushed in generation order.
fn sse_response(mut rx: mpsc::Receiver<ProgressEvent>) -> Response {
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(payload) => {
                    yield Ok::<Bytes, Infallible>(Bytes::from(format!("data: {payload}\n\n")));
                }
                Err(e) => warn!(error = %e, "failed to serialize progress event"),
            }
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}
