mod support;

use std::{cell::RefCell, time::Duration};

use graphprobe_diagnostics::{CheckStatus, StackProbes};
use graphprobe_docker::DockerCli;
use graphprobe_graph::Neo4jHttpClient;
use graphprobe_llm::OllamaClient;
use graphprobe_mcp::McpEndpoint;
use graphprobe_scenarios::{
    memory_flow, render_suite_report, run_suite, MemoryFlowSettings, SuiteKind, SuiteSelection,
    SAMPLE_MEMORIES,
};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::tempdir;

use support::{
    live_sse_probe, mock_neo4j, mock_ollama, running_container, stack_config,
    write_stdio_memory_server,
};

#[test]
fn integration_integration_suite_passes_over_stdio_memory_server() {
    let ollama_server = MockServer::start();
    let neo4j_server = MockServer::start();
    mock_ollama(&ollama_server);
    mock_neo4j(&neo4j_server);
    let temp = tempdir().expect("tempdir");
    let script = temp.path().join("memory-server.sh");
    write_stdio_memory_server(&script);
    let config = stack_config(&ollama_server, &neo4j_server, &script);

    let docker = DockerCli::new(
        running_container(),
        &config.docker_bin,
        &config.container,
        config.command_timeout,
    );
    let ollama = OllamaClient::new(&config.ollama_url, config.http_timeout).expect("ollama");
    let graph = Neo4jHttpClient::new(&config.neo4j_http_config()).expect("graph");
    let probes = StackProbes {
        docker: &docker,
        ollama: &ollama,
        graph: &graph,
        sse_probe: &live_sse_probe,
    };
    let endpoint = config.mcp_endpoint().expect("endpoint");
    assert!(matches!(endpoint, McpEndpoint::Stdio { .. }));
    let connect = || endpoint.connect(config.command_timeout);
    let settings = config.suite_settings(false).expect("suite settings");
    let mut sleeper = |_: Duration| {};

    let report = run_suite(
        probes,
        &settings,
        &connect,
        SuiteSelection::Integration,
        &mut sleeper,
    );

    assert!(report.gate_passed);
    assert_eq!(report.suites.len(), 1);
    assert_eq!(report.suites[0].kind, SuiteKind::Integration);
    let failed = report.suites[0]
        .scenarios
        .iter()
        .filter(|scenario| !scenario.passed)
        .map(|scenario| scenario.name.clone())
        .collect::<Vec<_>>();
    assert!(failed.is_empty(), "failed scenarios: {failed:?}");
    assert_eq!(report.exit_code(), 0);
    assert!(render_suite_report(&report).contains("success_rate=100.0"));
}

#[test]
fn integration_memory_flow_polls_graph_until_episodes_are_visible() {
    let neo4j_server = MockServer::start();
    let ollama_server = MockServer::start();
    let rows = SAMPLE_MEMORIES
        .iter()
        .enumerate()
        .map(|(index, memory)| {
            json!({"row": [
                format!("uuid-{index}"),
                format!("{}-itest", memory.name),
                memory.content,
                "text",
                1_700_000_000_000_i64 + index as i64
            ]})
        })
        .collect::<Vec<_>>();
    let episodes = neo4j_server.mock(|when, then| {
        when.method(POST)
            .path("/db/neo4j/tx/commit")
            .body_includes("e.name IN $names")
            .body_includes("user_preference_discussion-itest");
        then.status(200).json_body(json!({
            "results": [{
                "columns": ["uuid", "name", "content", "source", "created_at"],
                "data": rows
            }],
            "errors": []
        }));
    });
    let temp = tempdir().expect("tempdir");
    let script = temp.path().join("memory-server.sh");
    write_stdio_memory_server(&script);
    let config = stack_config(&ollama_server, &neo4j_server, &script);
    let graph = Neo4jHttpClient::new(&config.neo4j_http_config()).expect("graph");
    let mut client = config
        .mcp_endpoint()
        .expect("endpoint")
        .connect_initialized(config.command_timeout)
        .expect("initialized client");
    let settings = MemoryFlowSettings {
        run_id: "itest".to_string(),
        ..config.memory_flow_settings(true)
    };
    let sleeps = RefCell::new(0);
    let mut sleeper = |_: Duration| *sleeps.borrow_mut() += 1;

    let report = memory_flow(&mut client, &graph, &settings, &mut sleeper);

    episodes.assert();
    assert!(report.passed, "memory flow failed: {:?}", report.steps);
    let ingested = report
        .steps
        .iter()
        .find(|step| step.name == "graph.ingested")
        .expect("ingestion step");
    assert_eq!(ingested.status, CheckStatus::Pass);
    assert_eq!(ingested.detail, "3 episodes visible after 1 attempts");
    let cleanups = report
        .steps
        .iter()
        .filter(|step| step.name.starts_with("cleanup."))
        .count();
    assert_eq!(cleanups, 3);
    assert_eq!(*sleeps.borrow(), 0);
}
