//! Configuration management for the operations agent
//!
//! Handles environment variables and fixed fallback defaults.

use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Default CRM tool server address
pub const DEFAULT_CRM_SERVER_URL: &str = "http://127.0.0.1:8001";

/// Default email tool server address
pub const DEFAULT_EMAIL_SERVER_URL: &str = "http://127.0.0.1:8002";

/// Default port for the workflow event relay
pub const DEFAULT_RELAY_PORT: u16 = 8080;

/// Fixed deadline applied to the health check, initialize, and every
/// tool request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the operations agent
#[derive(Debug, Clone)]
pub struct Config {
    /// Address of the CRM tool server
    pub crm_server_url: String,

    /// Address of the email tool server
    pub email_server_url: String,

    /// Port the event relay listens on
    pub relay_port: u16,

    /// Per-request deadline for MCP exchanges
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let crm_server_url = Self::server_url("CRM_SERVER_URL", DEFAULT_CRM_SERVER_URL)?;
        let email_server_url = Self::server_url("EMAIL_SERVER_URL", DEFAULT_EMAIL_SERVER_URL)?;

        let relay_port = std::env::var("OPS_AGENT_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_RELAY_PORT);

        Ok(Self {
            crm_server_url,
            email_server_url,
            relay_port,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Read a server URL from the environment and validate it
    fn server_url(var: &str, default: &str) -> Result<String> {
        let value = std::env::var(var).unwrap_or_else(|_| default.to_string());
        let value = value.trim_end_matches('/').to_string();

        reqwest::Url::parse(&value).map_err(|_| ConfigError::InvalidUrl {
            var: var.to_string(),
            value: value.clone(),
        })?;

        Ok(value)
    }
}
