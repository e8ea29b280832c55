use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Header-level view of an SSE endpoint.
pub struct SseProbe {
    pub status: u16,
    pub content_type: String,
    pub reachable: bool,
}

/// Opens the stream and judges it from the response headers alone.
///
/// The body is never read, so a live endpoint that keeps streaming still
/// returns promptly. Connection failures are errors.
pub fn probe_sse_endpoint(url: &str, timeout: Duration) -> Result<SseProbe> {
    let client = Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .context("failed to build mcp sse probe client")?;
    let response = client
        .get(url)
        .header("accept", "text/event-stream")
        .send()
        .with_context(|| format!("mcp sse probe request to {url} failed"))?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let reachable = status.is_success() && content_type.contains("text/event-stream");
    tracing::debug!(url, status = status.as_u16(), content_type = %content_type, "mcp sse probe");
    Ok(SseProbe {
        status: status.as_u16(),
        content_type,
        reachable,
    })
}

#[cfg(test)]
mod tests {
    use httpmock::{Method::GET, MockServer};

    use super::*;

    #[test]
    fn functional_probe_accepts_event_stream() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/sse").header("accept", "text/event-stream");
            then.status(200)
                .header("content-type", "text/event-stream; charset=utf-8")
                .body("event: endpoint\ndata: /messages/?session_id=1\n\n");
        });
        let probe = probe_sse_endpoint(&server.url("/sse"), Duration::from_secs(2)).expect("probe");
        assert!(probe.reachable);
        assert_eq!(probe.status, 200);
    }

    #[test]
    fn regression_probe_rejects_wrong_content_type_and_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/json");
            then.status(200).header("content-type", "application/json").body("{}");
        });
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });
        let wrong_type =
            probe_sse_endpoint(&server.url("/json"), Duration::from_secs(2)).expect("probe");
        assert!(!wrong_type.reachable);
        let missing =
            probe_sse_endpoint(&server.url("/missing"), Duration::from_secs(2)).expect("probe");
        assert_eq!(missing.status, 404);
        assert!(!missing.reachable);
    }

    #[test]
    fn regression_probe_refused_connection_is_error() {
        let error = probe_sse_endpoint("http://127.0.0.1:9/sse", Duration::from_millis(500))
            .expect_err("refused");
        assert!(error.to_string().contains("sse probe"));
    }
}
