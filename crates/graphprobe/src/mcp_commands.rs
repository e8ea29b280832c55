use anyhow::{bail, Context, Result};
use graphprobe_cli::McpCommand;
use graphprobe_core::{preview, single_line};
use graphprobe_mcp::{missing_tools, probe_sse_endpoint, ToolCallOutcome};
use serde_json::Value;

use crate::report_output::emit;
use crate::stack_runtime::StackRuntime;

/// Pretty JSON when the tool answered with a payload, otherwise its text.
pub(crate) fn render_tool_outcome(outcome: &ToolCallOutcome) -> String {
    outcome
        .payload()
        .and_then(|payload| serde_json::to_string_pretty(&payload).ok())
        .unwrap_or_else(|| outcome.text.clone())
}

fn parse_arguments(raw: &str) -> Result<Value> {
    let arguments = serde_json::from_str::<Value>(raw)
        .with_context(|| format!("tool arguments are not valid json: {raw}"))?;
    if !arguments.is_object() {
        bail!("tool arguments must be a json object");
    }
    Ok(arguments)
}

pub(crate) fn execute(runtime: &StackRuntime, command: McpCommand) -> Result<i32> {
    match command {
        McpCommand::Probe => {
            let url = runtime.config.mcp_sse_url.as_str();
            let probe = probe_sse_endpoint(url, runtime.config.http_timeout)?;
            emit(
                &format!(
                    "mcp probe: url={url} status={} content_type={} reachable={}",
                    probe.status, probe.content_type, probe.reachable
                ),
                None,
            )?;
            Ok(if probe.reachable { 0 } else { 1 })
        }
        McpCommand::Clear { confirm_clear } => {
            if !confirm_clear {
                bail!("refusing to clear the knowledge graph without --confirm-clear");
            }
            let mut client = runtime.mcp_client()?;
            let outcome = client.clear_graph(true).context("clear_graph failed")?;
            emit(&render_tool_outcome(&outcome), None)?;
            Ok(0)
        }
        McpCommand::Call { tool, arguments } => {
            let arguments = parse_arguments(&arguments)?;
            let mut client = runtime.mcp_client()?;
            let outcome = client
                .call_tool(&tool, arguments)
                .with_context(|| format!("tool call '{tool}' failed"))?;
            emit(&render_tool_outcome(&outcome), None)?;
            Ok(if outcome.is_error { 1 } else { 0 })
        }
        McpCommand::Tools => {
            let mut client = runtime.mcp_client()?;
            let tools = client.list_tools().context("tools/list failed")?;
            let missing = missing_tools(&tools);
            let mut lines = tools
                .iter()
                .map(|tool| {
                    format!(
                        "mcp tool: name={} description={}",
                        tool.name,
                        preview(&single_line(&tool.description), 80)
                    )
                })
                .collect::<Vec<_>>();
            lines.push(format!(
                "mcp tools: total={} missing={}",
                tools.len(),
                if missing.is_empty() {
                    "none".to_string()
                } else {
                    missing.join(",")
                }
            ));
            emit(&lines.join("\n"), None)?;
            Ok(if missing.is_empty() { 0 } else { 1 })
        }
        McpCommand::Status => {
            let mut client = runtime.mcp_client()?;
            let outcome = client.get_status().context("get_status failed")?;
            emit(&render_tool_outcome(&outcome), None)?;
            Ok(0)
        }
    }
}
