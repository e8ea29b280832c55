use thiserror::Error;

#[derive(Debug, Error)]
/// Failure modes of an MCP exchange.
pub enum McpError {
    #[error("mcp transport closed: {0}")]
    Closed(String),
    #[error("mcp request '{id}' timed out after {timeout_ms} ms")]
    Timeout { id: String, timeout_ms: u64 },
    #[error("mcp server returned json-rpc error code={code} message={message}")]
    Rpc { code: i64, message: String },
    #[error("mcp protocol violation: {0}")]
    Protocol(String),
    #[error("mcp transport failed: {0}")]
    Transport(String),
    #[error("mcp io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("mcp http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl McpError {
    /// Stable reason code used by diagnostics and scenario reports.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Closed(_) => "mcp_transport_closed",
            Self::Timeout { .. } => "mcp_request_timeout",
            Self::Rpc { .. } => "mcp_jsonrpc_error",
            Self::Protocol(_) => "mcp_protocol_violation",
            Self::Transport(_) | Self::Io(_) => "mcp_transport_failed",
            Self::Http(_) => "mcp_http_request_failed",
        }
    }
}
