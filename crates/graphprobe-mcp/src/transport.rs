use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::error::McpError;
use crate::jsonrpc::response_id;

/// Wire transport carrying JSON-RPC messages to and from one MCP server.
pub trait McpTransport {
    fn send(&mut self, message: &Value) -> Result<(), McpError>;

    /// Waits for the response with `id`, skipping unrelated messages.
    fn receive_for(&mut self, id: &str, timeout: Duration) -> Result<Value, McpError>;
}

impl<T: McpTransport + ?Sized> McpTransport for Box<T> {
    fn send(&mut self, message: &Value) -> Result<(), McpError> {
        (**self).send(message)
    }

    fn receive_for(&mut self, id: &str, timeout: Duration) -> Result<Value, McpError> {
        (**self).receive_for(id, timeout)
    }
}

/// Drains `inbound` until the response for `id` arrives or the deadline passes.
pub(crate) fn await_response(
    inbound: &Receiver<Value>,
    id: &str,
    timeout: Duration,
    closed_context: impl Fn() -> String,
) -> Result<Value, McpError> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(McpError::Timeout {
                id: id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        match inbound.recv_timeout(remaining) {
            Ok(message) => match response_id(&message) {
                Some(found) if found == id => return Ok(message),
                _ => {
                    tracing::debug!(
                        expected = id,
                        message = %message,
                        "skipping unrelated mcp message"
                    );
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                return Err(McpError::Timeout {
                    id: id.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => return Err(McpError::Closed(closed_context())),
        }
    }
}
