use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use reqwest::{blocking::Client, blocking::Response, Url};
use serde_json::Value;

use crate::error::McpError;
use crate::sse::{SseEvent, SseParser};
use crate::transport::{await_response, McpTransport};

const ENDPOINT_EVENT: &str = "endpoint";
const MESSAGE_EVENT: &str = "message";

/// MCP over a long-lived event stream plus POSTed requests.
///
/// The server announces the POST target in an `endpoint` event; responses
/// arrive as `message` events on the stream.
pub struct SseTransport {
    client: Client,
    message_url: Url,
    inbound: Receiver<Value>,
    reader: StreamReader,
}

/// Owns the thread reading the event stream.
///
/// Dropping it raises the stop flag; the thread then exits at its next read
/// and closes the stream connection.
struct StreamReader {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamReader {
    fn spawn(response: Response, endpoint: Sender<String>, messages: Sender<Value>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = thread::spawn(move || pump_stream(response, &flag, &endpoint, &messages));
        Self {
            stop,
            thread: Some(thread),
        }
    }

    fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.is_finished() {
            if thread.join().is_err() {
                tracing::debug!("mcp sse reader panicked");
            }
        } else {
            tracing::debug!("mcp sse reader signalled to stop");
        }
    }
}

fn forward_event(event: SseEvent, endpoint: &Sender<String>, messages: &Sender<Value>) -> bool {
    match event.event.as_str() {
        ENDPOINT_EVENT => {
            // Only the first announcement has a listener.
            let _ = endpoint.send(event.data.trim().to_string());
            true
        }
        MESSAGE_EVENT => match serde_json::from_str::<Value>(&event.data) {
            Ok(message) => messages.send(message).is_ok(),
            Err(_) => {
                tracing::debug!(data = %event.data, "skipping non-json sse message");
                true
            }
        },
        other => {
            tracing::debug!(event = other, "skipping sse event");
            true
        }
    }
}

fn pump_stream(
    mut response: Response,
    stop: &AtomicBool,
    endpoint: &Sender<String>,
    messages: &Sender<Value>,
) {
    let mut parser = SseParser::new();
    let mut chunk = [0_u8; 4096];
    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => {
                if stop.load(Ordering::Acquire) {
                    tracing::debug!("mcp sse reader stopped");
                    return;
                }
                for event in parser.feed(&chunk[..read]) {
                    if !forward_event(event, endpoint, messages) {
                        return;
                    }
                }
            }
            Err(error) => {
                tracing::debug!(error = %error, "mcp sse stream read failed");
                break;
            }
        }
    }
    if let Some(event) = parser.finish() {
        forward_event(event, endpoint, messages);
    }
    tracing::debug!("mcp sse stream ended");
}

impl SseTransport {
    /// Opens the stream and waits up to `timeout` for the endpoint announcement.
    pub fn connect(sse_url: &str, timeout: Duration) -> Result<Self, McpError> {
        let stream_url = Url::parse(sse_url).map_err(|error| {
            McpError::Transport(format!("invalid mcp sse url '{sse_url}': {error}"))
        })?;
        let stream_client = Client::builder()
            .connect_timeout(timeout)
            .timeout(None::<Duration>)
            .build()?;
        let response = stream_client
            .get(stream_url.clone())
            .header("accept", "text/event-stream")
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(McpError::Transport(format!(
                "mcp sse endpoint returned status {status}"
            )));
        }

        let (endpoint_sender, endpoints) = channel();
        let (message_sender, inbound) = channel();
        let reader = StreamReader::spawn(response, endpoint_sender, message_sender);

        let endpoint = match endpoints.recv_timeout(timeout) {
            Ok(endpoint) => endpoint,
            Err(RecvTimeoutError::Timeout) => {
                return Err(McpError::Timeout {
                    id: ENDPOINT_EVENT.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(McpError::Closed(
                    "sse stream ended before the endpoint event".to_string(),
                ))
            }
        };
        let message_url = stream_url.join(&endpoint).map_err(|error| {
            McpError::Protocol(format!("invalid endpoint '{endpoint}' announced: {error}"))
        })?;
        tracing::debug!(endpoint = %message_url, "mcp sse session established");

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            message_url,
            inbound,
            reader,
        })
    }

    pub fn message_url(&self) -> &str {
        self.message_url.as_str()
    }

    /// Whether the stream is still being read.
    pub fn is_streaming(&self) -> bool {
        self.reader.is_running()
    }
}

impl McpTransport for SseTransport {
    fn send(&mut self, message: &Value) -> Result<(), McpError> {
        let response = self
            .client
            .post(self.message_url.clone())
            .json(message)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable response body>".to_string());
            return Err(McpError::Transport(format!(
                "mcp message post returned status {status} body {body}"
            )));
        }
        Ok(())
    }

    fn receive_for(&mut self, id: &str, timeout: Duration) -> Result<Value, McpError> {
        await_response(&self.inbound, id, timeout, || "sse stream ended".to_string())
    }
}
