//! Workflow progress events
//!
//! The ordered, typed narrative a workflow run publishes to its observer.
//! A `step` event with a given id is emitted once per state transition
//! (running, then success or error); consumers treat the later event as
//! an update of the earlier one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Overall workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Idle,
    Running,
    Completed,
    Error,
}

/// State of a single workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Running,
    Success,
    Error,
}

/// One progress event in a workflow run's event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Overall workflow state change
    Status { state: WorkflowState },

    /// A named phase transitioning through running -> success | error
    Step {
        id: String,
        label: String,
        state: StepState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<Value>,
    },

    /// A partial or final business outcome
    Result { data: Value },

    /// Terminal failure detail
    Error { message: String },
}

impl ProgressEvent {
    pub fn status(state: WorkflowState) -> Self {
        Self::Status { state }
    }

    pub fn step(id: &str, label: &str, state: StepState) -> Self {
        Self::Step {
            id: id.to_string(),
            label: label.to_string(),
            state,
            detail: None,
        }
    }

    /// Step error transition carrying the failure text as detail
    pub fn step_failed(id: &str, label: &str, detail: impl Into<String>) -> Self {
        Self::Step {
            id: id.to_string(),
            label: label.to_string(),
            state: StepState::Error,
            detail: Some(Value::String(detail.into())),
        }
    }

    pub fn result(data: Value) -> Self {
        Self::Result { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
