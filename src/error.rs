//! Error types for the operations agent
//!
//! This module defines the error hierarchy for all operations in the agent.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the operations agent
#[derive(Error, Debug)]
pub enum OpsAgentError {
    /// MCP client errors
    #[error("MCP client error: {0}")]
    Client(#[from] ClientError),

    /// Workflow errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// MCP client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{server}: not connected")]
    NotConnected { server: String },

    #[error("{server}: already connected")]
    AlreadyConnected { server: String },

    #[error("{server}: client closed; create a new instance to reconnect")]
    Closed { server: String },

    #[error("{server}: health check failed: {message}")]
    HealthCheck { server: String, message: String },

    #[error("{server}: initialize failed: {message}")]
    Initialize { server: String, message: String },

    #[error("server returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("connection closed")]
    ConnectionClosed,
}

/// Workflow-level errors
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("{tool} result is missing required field '{field}'")]
    MissingField { tool: String, field: String },

    #[error("{tool} reported failure: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("{tool} returned an unexpected payload: {message}")]
    UnexpectedPayload { tool: String, message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid URL in {var}: {value}")]
    InvalidUrl { var: String, value: String },
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, OpsAgentError>;
