//! Typed wrappers over the memory server's tool catalog.

use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{McpClient, ToolCallOutcome, ToolDescriptor};
use crate::error::McpError;
use crate::transport::McpTransport;

pub const ADD_MEMORY_TOOL: &str = "add_memory";
pub const SEARCH_MEMORY_NODES_TOOL: &str = "search_memory_nodes";
pub const SEARCH_MEMORY_FACTS_TOOL: &str = "search_memory_facts";
pub const GET_EPISODES_TOOL: &str = "get_episodes";
pub const GET_ENTITY_EDGE_TOOL: &str = "get_entity_edge";
pub const DELETE_EPISODE_TOOL: &str = "delete_episode";
pub const DELETE_ENTITY_EDGE_TOOL: &str = "delete_entity_edge";
pub const CLEAR_GRAPH_TOOL: &str = "clear_graph";
pub const GET_STATUS_TOOL: &str = "get_status";

pub const EXPECTED_MEMORY_TOOLS: [&str; 9] = [
    ADD_MEMORY_TOOL,
    SEARCH_MEMORY_NODES_TOOL,
    SEARCH_MEMORY_FACTS_TOOL,
    GET_EPISODES_TOOL,
    GET_ENTITY_EDGE_TOOL,
    DELETE_EPISODE_TOOL,
    DELETE_ENTITY_EDGE_TOOL,
    CLEAR_GRAPH_TOOL,
    GET_STATUS_TOOL,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddMemoryRequest {
    pub name: String,
    pub episode_body: String,
    pub source: String,
    pub source_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl AddMemoryRequest {
    pub fn text(name: &str, body: &str, source_description: &str) -> Self {
        Self {
            name: name.to_string(),
            episode_body: body.to_string(),
            source: "text".to_string(),
            source_description: source_description.to_string(),
            group_id: None,
            uuid: None,
        }
    }

    pub fn with_group(mut self, group_id: &str) -> Self {
        self.group_id = Some(group_id.to_string());
        self
    }
}

/// Expected tools absent from `catalog`, in catalog order.
pub fn missing_tools(catalog: &[ToolDescriptor]) -> Vec<&'static str> {
    EXPECTED_MEMORY_TOOLS
        .iter()
        .copied()
        .filter(|expected| !catalog.iter().any(|tool| tool.name == *expected))
        .collect()
}

fn checked(tool: &str, outcome: ToolCallOutcome) -> Result<ToolCallOutcome, McpError> {
    if outcome.is_error {
        return Err(McpError::Protocol(format!(
            "tool '{tool}' reported an error: {}",
            outcome.text
        )));
    }
    if let Some(Value::Object(payload)) = outcome.payload() {
        if let Some(error) = payload.get("error").and_then(Value::as_str) {
            return Err(McpError::Protocol(format!("tool '{tool}' failed: {error}")));
        }
    }
    Ok(outcome)
}

impl<T: McpTransport> McpClient<T> {
    fn call_checked(&mut self, tool: &str, arguments: Value) -> Result<ToolCallOutcome, McpError> {
        let outcome = self.call_tool(tool, arguments)?;
        checked(tool, outcome)
    }

    pub fn add_memory(&mut self, request: &AddMemoryRequest) -> Result<ToolCallOutcome, McpError> {
        let arguments = serde_json::to_value(request)
            .map_err(|error| McpError::Protocol(format!("failed to encode add_memory: {error}")))?;
        self.call_checked(ADD_MEMORY_TOOL, arguments)
    }

    pub fn search_memory_nodes(
        &mut self,
        query: &str,
        group_ids: &[String],
        max_nodes: usize,
    ) -> Result<ToolCallOutcome, McpError> {
        self.call_checked(
            SEARCH_MEMORY_NODES_TOOL,
            json!({ "query": query, "group_ids": group_ids, "max_nodes": max_nodes }),
        )
    }

    pub fn search_memory_facts(
        &mut self,
        query: &str,
        group_ids: &[String],
        max_facts: usize,
    ) -> Result<ToolCallOutcome, McpError> {
        self.call_checked(
            SEARCH_MEMORY_FACTS_TOOL,
            json!({ "query": query, "group_ids": group_ids, "max_facts": max_facts }),
        )
    }

    pub fn get_episodes(
        &mut self,
        group_id: &str,
        last_n: usize,
    ) -> Result<ToolCallOutcome, McpError> {
        self.call_checked(
            GET_EPISODES_TOOL,
            json!({ "group_id": group_id, "last_n": last_n }),
        )
    }

    pub fn get_entity_edge(&mut self, uuid: &str) -> Result<ToolCallOutcome, McpError> {
        self.call_checked(GET_ENTITY_EDGE_TOOL, json!({ "uuid": uuid }))
    }

    pub fn delete_episode(&mut self, uuid: &str) -> Result<ToolCallOutcome, McpError> {
        self.call_checked(DELETE_EPISODE_TOOL, json!({ "uuid": uuid }))
    }

    pub fn delete_entity_edge(&mut self, uuid: &str) -> Result<ToolCallOutcome, McpError> {
        self.call_checked(DELETE_ENTITY_EDGE_TOOL, json!({ "uuid": uuid }))
    }

    /// Wipes the whole graph; refused unless `confirmed`.
    pub fn clear_graph(&mut self, confirmed: bool) -> Result<ToolCallOutcome, McpError> {
        if !confirmed {
            return Err(McpError::Protocol(
                "clear_graph requires explicit confirmation".to_string(),
            ));
        }
        tracing::warn!("clearing all data from the knowledge graph");
        self.call_checked(CLEAR_GRAPH_TOOL, json!({}))
    }

    pub fn get_status(&mut self) -> Result<ToolCallOutcome, McpError> {
        self.call_checked(GET_STATUS_TOOL, json!({}))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::client::tests::QueueTransport;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn unit_missing_tools_reports_gaps_in_order() {
        let catalog = vec![descriptor("add_memory"), descriptor("get_status")];
        let missing = missing_tools(&catalog);
        assert_eq!(missing.len(), 7);
        assert_eq!(missing[0], "search_memory_nodes");
        assert!(!missing.contains(&"add_memory"));
    }

    #[test]
    fn unit_add_memory_omits_unset_optional_fields() {
        let transport = QueueTransport::with_results(vec![json!({
            "content": [{"type": "text", "text": "{\"message\":\"Episode queued\"}"}]
        })]);
        let mut client = McpClient::new(transport, Duration::from_secs(1));
        client
            .add_memory(&AddMemoryRequest::text("Coding Preferences", "Prefers Rust", "probe"))
            .expect("add");
        let arguments = &client.transport_mut().sent[0]["params"]["arguments"];
        assert_eq!(arguments["source"], "text");
        assert!(arguments.get("group_id").is_none());
        assert!(arguments.get("uuid").is_none());
    }

    #[test]
    fn regression_tool_error_payload_becomes_error() {
        let transport = QueueTransport::with_results(vec![json!({
            "content": [{"type": "text", "text": "{\"error\":\"Graphiti client not initialized\"}"}]
        })]);
        let mut client = McpClient::new(transport, Duration::from_secs(1));
        let error = client.get_status().expect_err("tool error");
        assert!(error.to_string().contains("not initialized"));
    }

    #[test]
    fn regression_clear_graph_requires_confirmation() {
        let mut client = McpClient::new(QueueTransport::default(), Duration::from_secs(1));
        assert!(client.clear_graph(false).is_err());
        assert!(client.transport_mut().sent.is_empty());
    }

    #[test]
    fn unit_search_arguments_carry_group_ids_and_limits() {
        let transport = QueueTransport::with_results(vec![json!({"content": []})]);
        let mut client = McpClient::new(transport, Duration::from_secs(1));
        client
            .search_memory_facts("typescript", &["default".to_string()], 5)
            .expect("search");
        let arguments = &client.transport_mut().sent[0]["params"]["arguments"];
        assert_eq!(arguments["group_ids"], json!(["default"]));
        assert_eq!(arguments["max_facts"], 5);
    }

    #[test]
    fn functional_get_entity_edge_sends_uuid_and_returns_fact_payload() {
        let transport = QueueTransport::with_results(vec![json!({
            "content": [{
                "type": "text",
                "text": "{\"uuid\":\"edge-7\",\"fact\":\"Alice prefers Rust\",\"name\":\"PREFERS\"}"
            }]
        })]);
        let mut client = McpClient::new(transport, Duration::from_secs(1));
        let outcome = client.get_entity_edge("edge-7").expect("edge");

        let sent = &client.transport_mut().sent[0];
        assert_eq!(sent["method"], "tools/call");
        assert_eq!(sent["params"]["name"], GET_ENTITY_EDGE_TOOL);
        assert_eq!(sent["params"]["arguments"], json!({"uuid": "edge-7"}));
        let payload = outcome.payload().expect("json payload");
        assert_eq!(payload["fact"], "Alice prefers Rust");
    }

    #[test]
    fn regression_get_entity_edge_maps_missing_edge_to_error() {
        let transport = QueueTransport::with_results(vec![json!({
            "content": [{"type": "text", "text": "{\"error\":\"Entity edge not found\"}"}]
        })]);
        let mut client = McpClient::new(transport, Duration::from_secs(1));
        let error = client.get_entity_edge("edge-missing").expect_err("missing edge");
        assert!(error.to_string().contains("get_entity_edge"));
        assert!(error.to_string().contains("Entity edge not found"));
    }

    #[test]
    fn functional_delete_entity_edge_sends_uuid_and_accepts_confirmation() {
        let transport = QueueTransport::with_results(vec![json!({
            "content": [{
                "type": "text",
                "text": "{\"message\":\"Entity edge with UUID edge-7 deleted successfully\"}"
            }]
        })]);
        let mut client = McpClient::new(transport, Duration::from_secs(1));
        let outcome = client.delete_entity_edge("edge-7").expect("delete");

        let sent = &client.transport_mut().sent[0];
        assert_eq!(sent["params"]["name"], DELETE_ENTITY_EDGE_TOOL);
        assert_eq!(sent["params"]["arguments"], json!({"uuid": "edge-7"}));
        assert!(!outcome.is_error);
        assert!(outcome.text.contains("deleted successfully"));
    }

    #[test]
    fn regression_delete_entity_edge_surfaces_is_error_flag() {
        let transport = QueueTransport::with_results(vec![json!({
            "isError": true,
            "content": [{"type": "text", "text": "database unavailable"}]
        })]);
        let mut client = McpClient::new(transport, Duration::from_secs(1));
        let error = client.delete_entity_edge("edge-7").expect_err("tool error");
        assert!(matches!(error, McpError::Protocol(_)));
        assert!(error.to_string().contains("delete_entity_edge"));
        assert!(error.to_string().contains("database unavailable"));
    }
}
