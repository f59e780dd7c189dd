//! Workflow module
//!
//! Progress event types and the order-processing orchestrator.

pub mod events;
pub mod orchestrator;
