//! MCP (Model Context Protocol) module
//!
//! Client-side protocol implementation: wire types, SSE framing, and the
//! per-server connection client.

pub mod client;
pub mod sse;
pub mod types;
