//! Model Context Protocol client for the memory server.
//!
//! JSON-RPC 2.0 over three transports: a spawned stdio process, the legacy
//! SSE stream with POSTed requests, and plain HTTP POST. Typed wrappers cover
//! the memory tool catalog.

pub mod client;
pub mod connect;
pub mod error;
pub mod http;
pub mod jsonrpc;
pub mod probe;
pub mod sse;
pub mod sse_transport;
pub mod stdio;
pub mod tools;
pub mod transport;

pub use client::{McpClient, ServerInfo, ToolCallOutcome, ToolDescriptor};
pub use connect::{DynMcpClient, McpEndpoint};
pub use error::McpError;
pub use http::HttpTransport;
pub use jsonrpc::{MCP_JSONRPC_VERSION, MCP_PROTOCOL_VERSION};
pub use probe::{probe_sse_endpoint, SseProbe};
pub use sse::{SseEvent, SseParser};
pub use sse_transport::SseTransport;
pub use stdio::StdioTransport;
pub use tools::{missing_tools, AddMemoryRequest, EXPECTED_MEMORY_TOOLS};
pub use transport::McpTransport;
