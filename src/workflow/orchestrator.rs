//! Order-processing workflow
//!
//! Runs one workflow instance end-to-end across the CRM and email tool
//! servers and emits an ordered progress narrative: connect to the CRM,
//! look up the customer email, connect to the email server, send the
//! shipping confirmation. The first failure at any phase terminates the
//! run; both clients are released on every path.

use std::future::Future;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{OpsAgentError, Result, WorkflowError};
use crate::mcp::client::McpClient;
use crate::mcp::types::CallToolResult;
use crate::workflow::events::{ProgressEvent, StepState, WorkflowState};

pub const STEP_CONNECT_CRM: &str = "connect-crm";
pub const STEP_LOOKUP_EMAIL: &str = "lookup-email";
pub const STEP_CONNECT_EMAIL: &str = "connect-email";
pub const STEP_SEND_CONFIRMATION: &str = "send-confirmation";

pub const TOOL_GET_CUSTOMER_EMAIL: &str = "getCustomerEmail";
pub const TOOL_SEND_CONFIRMATION: &str = "sendShippingConfirmation";

/// One order-processing workflow run
pub struct OrderWorkflow {
    config: Config,
    events: mpsc::Sender<ProgressEvent>,
}

impl OrderWorkflow {
    pub fn new(config: Config, events: mpsc::Sender<ProgressEvent>) -> Self {
        Self { config, events }
    }

    /// Run the workflow for one order, constructing and owning the two
    /// tool-server clients for this run.
    pub async fn run(&self, order_id: &str) {
        let mut crm = McpClient::new(
            "crm",
            &self.config.crm_server_url,
            self.config.request_timeout,
        );
        let mut email = McpClient::new(
            "email",
            &self.config.email_server_url,
            self.config.request_timeout,
        );
        self.run_with_clients(order_id, &mut crm, &mut email).await;
    }

    /// Run the workflow over caller-supplied clients. Both clients are
    /// closed before the terminal events are emitted, whether or not
    /// they ever reached connected.
    pub async fn run_with_clients(
        &self,
        order_id: &str,
        crm: &mut McpClient,
        email: &mut McpClient,
    ) {
        info!(order_id, "starting order workflow");
        self.emit(ProgressEvent::status(WorkflowState::Running)).await;

        let outcome = self.execute(order_id, crm, email).await;

        crm.close().await;
        email.close().await;

        match outcome {
            Ok(result) => {
                self.emit(ProgressEvent::result(result)).await;
                self.emit(ProgressEvent::status(WorkflowState::Completed))
                    .await;
                info!(order_id, "order workflow completed");
            }
            Err(e) => {
                error!(order_id, error = %e, "order workflow failed");
                self.emit(ProgressEvent::error(e.to_string())).await;
                self.emit(ProgressEvent::status(WorkflowState::Error)).await;
            }
        }
    }

    async fn execute(
        &self,
        order_id: &str,
        crm: &mut McpClient,
        email: &mut McpClient,
    ) -> Result<Value> {
        self.run_step(STEP_CONNECT_CRM, "Connect to CRM server", async {
            crm.connect().await.map_err(OpsAgentError::from)
        })
        .await?;

        let email_address = self
            .run_step(STEP_LOOKUP_EMAIL, "Look up customer email", async {
                let raw = crm
                    .call_tool(TOOL_GET_CUSTOMER_EMAIL, json!({ "order_id": order_id }))
                    .await?;
                let payload = decode_tool_payload(TOOL_GET_CUSTOMER_EMAIL, raw)?;
                let email = payload.get("email").and_then(Value::as_str).ok_or_else(|| {
                    WorkflowError::MissingField {
                        tool: TOOL_GET_CUSTOMER_EMAIL.to_string(),
                        field: "email".to_string(),
                    }
                })?;
                Ok(email.to_string())
            })
            .await?;

        // Partial outcome: the observer holds a correct intermediate
        // result even if the send never happens.
        self.emit(ProgressEvent::result(json!({
            "orderId": order_id,
            "email": email_address,
            "emailSent": false,
        })))
        .await;

        self.run_step(STEP_CONNECT_EMAIL, "Connect to email server", async {
            email.connect().await.map_err(OpsAgentError::from)
        })
        .await?;

        let confirmation = self
            .run_step(
                STEP_SEND_CONFIRMATION,
                "Send shipping confirmation",
                async {
                    let raw = email
                        .call_tool(
                            TOOL_SEND_CONFIRMATION,
                            json!({
                                "email": email_address,
                                "order_details": { "order_id": order_id },
                            }),
                        )
                        .await?;
                    Ok(decode_tool_payload(TOOL_SEND_CONFIRMATION, raw)?)
                },
            )
            .await?;

        Ok(json!({
            "orderId": order_id,
            "email": email_address,
            "emailSent": true,
            "confirmation": confirmation,
        }))
    }

    /// Emit the running transition, await the phase, then emit the
    /// matching success or error transition.
    async fn run_step<T, F>(&self, id: &str, label: &str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.emit(ProgressEvent::step(id, label, StepState::Running))
            .await;

        match work.await {
            Ok(value) => {
                self.emit(ProgressEvent::step(id, label, StepState::Success))
                    .await;
                Ok(value)
            }
            Err(e) => {
                self.emit(ProgressEvent::step_failed(id, label, e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn emit(&self, event: ProgressEvent) {
        if self.events.send(event).await.is_err() {
            debug!("progress observer dropped; event discarded");
        }
    }
}

/// Decode a tool invocation result: the first text content item holds a
/// JSON-encoded value. Non-JSON text is wrapped as `{"raw": <text>}`;
/// an `isError` result is a domain failure.
fn decode_tool_payload(tool: &str, raw: Value) -> std::result::Result<Value, WorkflowError> {
    let result: CallToolResult =
        serde_json::from_value(raw).map_err(|e| WorkflowError::UnexpectedPayload {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;

    if result.is_error {
        let message = result
            .first_text()
            .unwrap_or("tool reported an error")
            .to_string();
        return Err(WorkflowError::ToolFailed {
            tool: tool.to_string(),
            message,
        });
    }

    let text = result
        .first_text()
        .ok_or_else(|| WorkflowError::UnexpectedPayload {
            tool: tool.to_string(),
            message: "no text content".to_string(),
        })?;

    Ok(serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text })))
}
