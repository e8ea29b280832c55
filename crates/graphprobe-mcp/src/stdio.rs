use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;

use serde_json::Value;

use crate::error::McpError;
use crate::transport::{await_response, McpTransport};

/// Newline-delimited JSON over a child process's stdin and stdout.
pub struct StdioTransport {
    child: Child,
    stdin: ChildStdin,
    inbound: Receiver<Value>,
    command_line: String,
}

impl StdioTransport {
    /// Spawns `command_line`, split with shell quoting rules.
    pub fn spawn(command_line: &str) -> Result<Self, McpError> {
        let parts = shell_words::split(command_line).map_err(|error| {
            McpError::Transport(format!("invalid mcp stdio command '{command_line}': {error}"))
        })?;
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| McpError::Transport("mcp stdio command is empty".to_string()))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| {
                McpError::Transport(format!(
                    "failed to spawn mcp stdio server '{program}': {error}"
                ))
            })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            McpError::Transport("failed to open stdin for mcp stdio server".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::Transport("failed to open stdout for mcp stdio server".to_string())
        })?;
        let stderr = child.stderr.take();

        let (sender, inbound) = channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(message) => {
                        if sender.send(message).is_err() {
                            break;
                        }
                    }
                    Err(_) => tracing::debug!(line = trimmed, "skipping non-json mcp stdout line"),
                }
            }
        });
        if let Some(stderr) = stderr {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    tracing::debug!(line = %line, "mcp stdio server stderr");
                }
            });
        }
        tracing::debug!(command = command_line, pid = child.id(), "mcp stdio server spawned");
        Ok(Self {
            child,
            stdin,
            inbound,
            command_line: command_line.to_string(),
        })
    }

    fn exit_description(&mut self) -> String {
        match self.child.try_wait() {
            Ok(Some(status)) => format!("'{}' exited with {status}", self.command_line),
            _ => format!("'{}' closed its stdout", self.command_line),
        }
    }
}

impl McpTransport for StdioTransport {
    fn send(&mut self, message: &Value) -> Result<(), McpError> {
        let mut line = serde_json::to_vec(message)
            .map_err(|error| McpError::Protocol(format!("failed to encode request: {error}")))?;
        line.push(b'\n');
        self.stdin.write_all(&line).map_err(|error| {
            McpError::Closed(format!("write to '{}' failed: {error}", self.command_line))
        })?;
        self.stdin.flush()?;
        Ok(())
    }

    fn receive_for(&mut self, id: &str, timeout: Duration) -> Result<Value, McpError> {
        let outcome = await_response(&self.inbound, id, timeout, String::new);
        match outcome {
            Err(McpError::Closed(_)) => Err(McpError::Closed(self.exit_description())),
            other => other,
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
