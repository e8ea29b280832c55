use std::fmt;
use std::time::Duration;

use crate::client::McpClient;
use crate::error::McpError;
use crate::http::HttpTransport;
use crate::sse_transport::SseTransport;
use crate::stdio::StdioTransport;
use crate::transport::McpTransport;

pub type DynMcpClient = McpClient<Box<dyn McpTransport>>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where and how to reach the memory server.
pub enum McpEndpoint {
    Stdio { command: String },
    Sse { url: String },
    Http { url: String },
}

impl McpEndpoint {
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Sse { .. } => "sse",
            Self::Http { .. } => "http",
        }
    }

    /// Opens the transport and returns an uninitialized client.
    pub fn connect(&self, timeout: Duration) -> Result<DynMcpClient, McpError> {
        let transport: Box<dyn McpTransport> = match self {
            Self::Stdio { command } => Box::new(StdioTransport::spawn(command)?),
            Self::Sse { url } => Box::new(SseTransport::connect(url, timeout)?),
            Self::Http { url } => Box::new(HttpTransport::new(url, timeout)?),
        };
        tracing::debug!(endpoint = %self, "mcp transport connected");
        Ok(McpClient::new(transport, timeout))
    }

    /// Connects and completes the initialize handshake.
    pub fn connect_initialized(&self, timeout: Duration) -> Result<DynMcpClient, McpError> {
        let mut client = self.connect(timeout)?;
        client.initialize()?;
        Ok(client)
    }
}

impl fmt::Display for McpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio { command } => write!(f, "stdio:{command}"),
            Self::Sse { url } => write!(f, "sse:{url}"),
            Self::Http { url } => write!(f, "http:{url}"),
        }
    }
}
