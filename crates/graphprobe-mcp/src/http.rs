use std::collections::VecDeque;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::McpError;
use crate::jsonrpc::response_id;
use crate::sse::SseParser;
use crate::transport::McpTransport;

const SESSION_HEADER: &str = "mcp-session-id";
/// Unclaimed responses kept between sends; older ones are dropped first.
const MAX_PENDING: usize = 32;

/// One POST per message; the reply body carries the response.
pub struct HttpTransport {
    client: Client,
    url: String,
    session_id: Option<String>,
    pending: VecDeque<Value>,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, McpError> {
        reqwest::Url::parse(url).map_err(|error| {
            McpError::Transport(format!("invalid mcp http url '{url}': {error}"))
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            session_id: None,
            pending: VecDeque::new(),
        })
    }

    fn queue_body(&mut self, content_type: &str, body: &str) -> Result<(), McpError> {
        if body.trim().is_empty() {
            return Ok(());
        }
        if content_type.contains("text/event-stream") {
            let mut parser = SseParser::new();
            let mut events = parser.feed(body.as_bytes());
            events.extend(parser.finish());
            for event in events.into_iter().filter(|event| event.event == "message") {
                match serde_json::from_str::<Value>(&event.data) {
                    Ok(message) => self.pending.push_back(message),
                    Err(_) => tracing::debug!(data = %event.data, "skipping non-json sse message"),
                }
            }
            self.trim_pending();
            return Ok(());
        }
        let payload = serde_json::from_str::<Value>(body).map_err(|error| {
            McpError::Protocol(format!("mcp http response is not json: {error}"))
        })?;
        match payload {
            Value::Array(messages) => self.pending.extend(messages),
            message => self.pending.push_back(message),
        }
        self.trim_pending();
        Ok(())
    }

    fn trim_pending(&mut self) {
        let excess = self.pending.len().saturating_sub(MAX_PENDING);
        if excess > 0 {
            tracing::debug!(dropped = excess, "dropping unclaimed mcp http responses");
            self.pending.drain(..excess);
        }
    }

    /// Removes the response for `id` and discards server notifications
    /// that arrived with it.
    fn claim(&mut self, id: &str) -> Option<Value> {
        let position = self
            .pending
            .iter()
            .position(|message| response_id(message).as_deref() == Some(id))?;
        let claimed = self.pending.remove(position);
        self.pending.retain(|message| response_id(message).is_some());
        claimed
    }
}

impl McpTransport for HttpTransport {
    fn send(&mut self, message: &Value) -> Result<(), McpError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("accept", "application/json, text/event-stream")
            .json(message);
        if let Some(session_id) = self.session_id.as_deref() {
            request = request.header(SESSION_HEADER, session_id);
        }
        let response = request.send()?;
        let status = response.status();
        if let Some(session_id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let body = response.text()?;
        if !status.is_success() {
            return Err(McpError::Transport(format!(
                "mcp http request failed with status {status} body {body}"
            )));
        }
        self.queue_body(&content_type, &body)
    }

    fn receive_for(&mut self, id: &str, _timeout: Duration) -> Result<Value, McpError> {
        self.claim(id).ok_or_else(|| {
            McpError::Protocol(format!(
                "mcp http server did not return a response for request '{id}'"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    use super::*;
    use crate::jsonrpc::jsonrpc_request_frame;

    #[test]
    fn functional_http_transport_reads_json_and_tracks_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/mcp")
                .body_includes("\"method\":\"initialize\"");
            then.status(200)
                .header("content-type", "application/json")
                .header("mcp-session-id", "session-42")
                .json_body(json!({
                    "jsonrpc": "2.0",
                    "id": "graphprobe-1",
                    "result": {"protocolVersion": "2024-11-05"}
                }));
        });
        let list = server.mock(|when, then| {
            when.method(POST)
                .path("/mcp")
                .header("mcp-session-id", "session-42")
                .body_includes("\"method\":\"tools/list\"");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(concat!(
                    "event: message\n",
                    "data: {\"jsonrpc\":\"2.0\",\"id\":\"graphprobe-2\",\"result\":{\"tools\":[]}}\n\n",
                ));
        });
        let mut transport =
            HttpTransport::new(&server.url("/mcp"), Duration::from_secs(5)).expect("transport");
        transport
            .send(&jsonrpc_request_frame("graphprobe-1", "initialize", json!({})))
            .expect("initialize");
        let init = transport
            .receive_for("graphprobe-1", Duration::from_secs(1))
            .expect("init response");
        assert_eq!(init["result"]["protocolVersion"], "2024-11-05");

        transport
            .send(&jsonrpc_request_frame("graphprobe-2", "tools/list", json!({})))
            .expect("list");
        list.assert();
        let listed = transport
            .receive_for("graphprobe-2", Duration::from_secs(1))
            .expect("list response");
        assert!(listed["result"]["tools"].as_array().expect("tools").is_empty());
    }

    #[test]
    fn regression_http_transport_accepts_empty_notification_reply() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/mcp");
            then.status(202);
        });
        let mut transport =
            HttpTransport::new(&server.url("/mcp"), Duration::from_secs(5)).expect("transport");
        transport
            .send(&json!({"jsonrpc":"2.0","method":"notifications/initialized"}))
            .expect("notification");
        assert!(matches!(
            transport.receive_for("graphprobe-9", Duration::from_secs(1)),
            Err(McpError::Protocol(_))
        ));
    }

    #[test]
    fn regression_http_transport_discards_notifications_once_response_is_claimed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/mcp");
            then.status(200).header("content-type", "text/event-stream").body(concat!(
                "event: message\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n\n",
                "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":\"graphprobe-3\",\"result\":{}}\n\n",
                "event: message\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\",\"params\":{}}\n\n",
            ));
        });
        let mut transport =
            HttpTransport::new(&server.url("/mcp"), Duration::from_secs(5)).expect("transport");
        transport
            .send(&jsonrpc_request_frame("graphprobe-3", "tools/call", json!({})))
            .expect("send");
        assert_eq!(transport.pending.len(), 3);
        transport
            .receive_for("graphprobe-3", Duration::from_secs(1))
            .expect("response");
        assert!(transport.pending.is_empty());
    }

    #[test]
    fn regression_http_transport_caps_unclaimed_responses() {
        let batch: Vec<Value> = (0..MAX_PENDING + 8)
            .map(|index| json!({"jsonrpc":"2.0","id":format!("stale-{index}"),"result":{}}))
            .collect();
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/mcp");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(Value::Array(batch.clone()));
        });
        let mut transport =
            HttpTransport::new(&server.url("/mcp"), Duration::from_secs(5)).expect("transport");
        transport
            .send(&jsonrpc_request_frame("graphprobe-4", "tools/list", json!({})))
            .expect("send");
        assert_eq!(transport.pending.len(), MAX_PENDING);
        assert!(matches!(
            transport.receive_for("stale-0", Duration::from_secs(1)),
            Err(McpError::Protocol(_))
        ));
        let newest = format!("stale-{}", MAX_PENDING + 7);
        assert!(transport.receive_for(&newest, Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn regression_http_transport_surfaces_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/mcp");
            then.status(500).body("boom");
        });
        let mut transport =
            HttpTransport::new(&server.url("/mcp"), Duration::from_secs(5)).expect("transport");
        let error = transport
            .send(&jsonrpc_request_frame("graphprobe-1", "tools/list", json!({})))
            .expect_err("500");
        assert!(error.to_string().contains("500"));
    }
}
