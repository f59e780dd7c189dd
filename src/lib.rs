//! Autonomous Operations Agent
//!
//! Processes customer orders by driving tools hosted on independent MCP
//! servers, and re-publishes each run's progress as an ordered event
//! stream for external observers.

pub mod config;
pub mod error;
pub mod mcp;
pub mod relay;
pub mod workflow;

pub use config::Config;
pub use error::{OpsAgentError, Result};
