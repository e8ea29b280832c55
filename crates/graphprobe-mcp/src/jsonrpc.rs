use serde_json::{json, Value};

use crate::error::McpError;

pub const MCP_JSONRPC_VERSION: &str = "2.0";
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const REQUEST_ID_PREFIX: &str = "graphprobe";

#[derive(Debug, Default)]
/// Per-client request id counter producing `graphprobe-<n>`.
pub struct RequestIdSequence {
    last: u64,
}

impl RequestIdSequence {
    pub fn next_id(&mut self) -> String {
        self.last = self.last.saturating_add(1);
        format!("{REQUEST_ID_PREFIX}-{}", self.last)
    }
}

pub fn jsonrpc_request_frame(id: &str, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": MCP_JSONRPC_VERSION,
        "id": id,
        "method": method,
        "params": params,
    })
}

pub fn jsonrpc_notification_frame(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": MCP_JSONRPC_VERSION,
        "method": method,
        "params": params,
    })
}

/// Id of a response message; requests and notifications from the server yield `None`.
pub fn response_id(message: &Value) -> Option<String> {
    if message.get("method").is_some() {
        return None;
    }
    if message.get("result").is_none() && message.get("error").is_none() {
        return None;
    }
    match message.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

pub fn jsonrpc_result(response: Value) -> Result<Value, McpError> {
    if let Some(error) = response.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .unwrap_or_default();
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown json-rpc error")
            .to_string();
        return Err(McpError::Rpc { code, message });
    }
    match response {
        Value::Object(mut object) => object
            .remove("result")
            .ok_or_else(|| McpError::Protocol("response carries no result object".to_string())),
        _ => Err(McpError::Protocol("response is not a JSON object".to_string())),
    }
}
