//! Fake services shared by the cross-crate tests.

#![allow(dead_code)]

use std::{fs, os::unix::fs::PermissionsExt, path::Path, time::Duration};

use graphprobe_cli::{CliTransport, StackArgs, StackConfig, StackProfile};
use graphprobe_docker::ScriptedCommandRunner;
use graphprobe_mcp::SseProbe;
use httpmock::prelude::*;
use serde_json::json;

pub const CONTAINER_LOGS: &str = "INFO Graphiti client initialized successfully\n\
INFO Using OpenAI model: deepseek-r1:latest\n\
INFO Running MCP server with SSE transport\n\
INFO Uvicorn running on http://0.0.0.0:8000\n";

/// Docker that reports the default container as running with a clean startup log.
pub fn running_container() -> ScriptedCommandRunner {
    ScriptedCommandRunner::new()
        .on_success(
            "docker",
            &["ps"],
            "mcp_server-graphiti-mcp-1\tUp 2 hours\t0.0.0.0:8000->8000/tcp\n",
        )
        .on_success("docker", &["logs"], CONTAINER_LOGS)
}

pub fn live_sse_probe(_url: &str, _timeout: Duration) -> anyhow::Result<SseProbe> {
    Ok(SseProbe {
        status: 200,
        content_type: "text/event-stream".to_string(),
        reachable: true,
    })
}

/// Ollama serving both configured models with a 1024-dimension embedder.
pub fn mock_ollama(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200).json_body(json!({
            "models": [
                {"name": "deepseek-r1:latest", "size": 4_700_000_000_u64},
                {"name": "mxbai-embed-large:latest", "size": 669_000_000_u64}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(200).json_body(json!({"response": "OK", "done": true}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/embeddings");
        then.status(200)
            .json_body(json!({"embedding": vec![0.01_f32; 1024]}));
    });
}

fn single_total(total: i64) -> serde_json::Value {
    json!({"results": [{"columns": ["total"], "data": [{"row": [total]}]}], "errors": []})
}

/// Neo4j answering ping, stats and the write probe.
pub fn mock_neo4j(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/db/neo4j/tx/commit")
            .body_includes("RETURN 1 AS test");
        then.status(200).json_body(json!({
            "results": [{"columns": ["test"], "data": [{"row": [1]}]}],
            "errors": []
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/db/neo4j/tx/commit")
            .body_includes("RETURN count(r) AS total");
        then.status(200).json_body(json!({
            "results": [
                {"columns": ["total"], "data": [{"row": [10]}]},
                {"columns": ["total"], "data": [{"row": [4]}]},
                {"columns": ["total"], "data": [{"row": [6]}]},
                {"columns": ["total"], "data": [{"row": [5]}]}
            ],
            "errors": []
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/db/neo4j/tx/commit")
            .body_includes("CREATE (p:HealthProbe");
        then.status(200).json_body(single_total(1));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/db/neo4j/tx/commit")
            .body_includes("DELETE p RETURN");
        then.status(200).json_body(single_total(1));
    });
}

/// Memory server over stdio exposing the full tool catalog.
pub fn write_stdio_memory_server(path: &Path) {
    fs::write(
        path,
        r#"#!/bin/sh
while IFS= read -r line; do
  [ -z "$line" ] && continue
  method=$(printf '%s' "$line" | sed -n 's/.*"method":"\([^"]*\)".*/\1/p')
  id=$(printf '%s' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  case "$method" in
    initialize)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"graphiti","version":"1.0.0"}}}\n' "$id"
      ;;
    tools/list)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"tools":[{"name":"add_memory"},{"name":"search_memory_nodes"},{"name":"search_memory_facts"},{"name":"get_episodes"},{"name":"get_entity_edge"},{"name":"delete_episode"},{"name":"delete_entity_edge"},{"name":"clear_graph"},{"name":"get_status"}]}}\n' "$id"
      ;;
    tools/call)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"isError":false,"content":[{"type":"text","text":"{\\"message\\":\\"ok\\"}"}]}}\n' "$id"
      ;;
  esac
done
"#,
    )
    .expect("write memory server script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

/// Stack configuration pointing at the mock servers and a stdio memory server.
pub fn stack_config(ollama: &MockServer, neo4j: &MockServer, mcp_script: &Path) -> StackConfig {
    let args = StackArgs {
        ollama_url: Some(ollama.base_url()),
        neo4j_http_url: Some(neo4j.base_url()),
        neo4j_password: Some("demodemo".to_string()),
        transport: Some(CliTransport::Stdio),
        mcp_stdio_command: Some(mcp_script.display().to_string()),
        poll_attempts: Some(1),
        poll_interval_ms: Some(1),
        http_timeout_ms: Some(5_000),
        command_timeout_ms: Some(5_000),
        ..StackArgs::default()
    };
    StackConfig::resolve_with_profile(&args, &StackProfile::default()).expect("stack config")
}
