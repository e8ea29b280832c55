use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::McpError;
use crate::jsonrpc::{
    jsonrpc_notification_frame, jsonrpc_request_frame, jsonrpc_result, RequestIdSequence,
    MCP_PROTOCOL_VERSION,
};
use crate::transport::McpTransport;

pub const CLIENT_NAME: &str = "graphprobe";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub protocol_version: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Result of `tools/call`: text blocks joined by newlines.
pub struct ToolCallOutcome {
    pub is_error: bool,
    pub text: String,
    pub structured: Option<Value>,
}

impl ToolCallOutcome {
    fn from_result(result: &Value) -> Self {
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let text = result
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|block| block.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        Self {
            is_error,
            text,
            structured: result.get("structuredContent").cloned(),
        }
    }

    /// Structured payload, or the text parsed as JSON when the server only sent text.
    pub fn payload(&self) -> Option<Value> {
        self.structured
            .clone()
            .or_else(|| serde_json::from_str::<Value>(&self.text).ok())
    }
}

pub struct McpClient<T> {
    transport: T,
    ids: RequestIdSequence,
    timeout: Duration,
}

impl<T: McpTransport> McpClient<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            ids: RequestIdSequence::default(),
            timeout,
        }
    }

    pub fn request(&mut self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.ids.next_id();
        tracing::debug!(id = %id, method, "mcp request");
        self.transport
            .send(&jsonrpc_request_frame(&id, method, params))?;
        let response = self.transport.receive_for(&id, self.timeout)?;
        jsonrpc_result(response)
    }

    pub fn notify(&mut self, method: &str, params: Value) -> Result<(), McpError> {
        self.transport
            .send(&jsonrpc_notification_frame(method, params))
    }

    /// Handshake: `initialize` followed by `notifications/initialized`.
    pub fn initialize(&mut self) -> Result<ServerInfo, McpError> {
        let result = self.request(
            "initialize",
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": CLIENT_NAME, "version": env!("CARGO_PKG_VERSION")},
            }),
        )?;
        let protocol_version = result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                McpError::Protocol("initialize result missing protocolVersion".to_string())
            })?
            .to_string();
        let server_info = result.get("serverInfo");
        let field = |key: &str| {
            server_info
                .and_then(|info| info.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let info = ServerInfo {
            protocol_version,
            name: field("name"),
            version: field("version"),
        };
        self.notify("notifications/initialized", json!({}))?;
        tracing::info!(
            server = %info.name,
            protocol = %info.protocol_version,
            "mcp session initialized"
        );
        Ok(info)
    }

    pub fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match cursor.as_deref() {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.request("tools/list", params)?;
            let page = result
                .get("tools")
                .and_then(Value::as_array)
                .ok_or_else(|| McpError::Protocol("invalid tools/list payload".to_string()))?;
            for tool in page {
                let name = tool
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| McpError::Protocol("tool descriptor missing name".to_string()))?;
                tools.push(ToolDescriptor {
                    name: name.to_string(),
                    description: tool
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                });
            }
            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .filter(|next| !next.is_empty())
                .map(ToString::to_string);
            if cursor.is_none() {
                return Ok(tools);
            }
        }
    }

    pub fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolCallOutcome, McpError> {
        let result = self.request(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        )?;
        let outcome = ToolCallOutcome::from_result(&result);
        tracing::debug!(tool = name, is_error = outcome.is_error, "mcp tool call finished");
        Ok(outcome)
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
