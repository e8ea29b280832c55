mod support;

use graphprobe_diagnostics::{run_health_check, StackProbes, Verdict};
use graphprobe_docker::{DockerCli, ScriptedCommandRunner};
use graphprobe_graph::Neo4jHttpClient;
use graphprobe_llm::OllamaClient;
use httpmock::prelude::*;
use tempfile::tempdir;

use support::{live_sse_probe, mock_neo4j, mock_ollama, running_container, stack_config};

fn build_clients(
    config: &graphprobe_cli::StackConfig,
    runner: ScriptedCommandRunner,
) -> (DockerCli<ScriptedCommandRunner>, OllamaClient, Neo4jHttpClient) {
    (
        DockerCli::new(runner, &config.docker_bin, &config.container, config.command_timeout),
        OllamaClient::new(&config.ollama_url, config.http_timeout).expect("ollama client"),
        Neo4jHttpClient::new(&config.neo4j_http_config()).expect("neo4j client"),
    )
}

#[test]
fn integration_health_check_is_healthy_against_live_stack() {
    let ollama_server = MockServer::start();
    let neo4j_server = MockServer::start();
    mock_ollama(&ollama_server);
    mock_neo4j(&neo4j_server);
    let temp = tempdir().expect("tempdir");
    let config = stack_config(&ollama_server, &neo4j_server, &temp.path().join("unused.sh"));
    let (docker, ollama, graph) = build_clients(&config, running_container());
    let probes = StackProbes {
        docker: &docker,
        ollama: &ollama,
        graph: &graph,
        sse_probe: &live_sse_probe,
    };

    let report = run_health_check(probes, &config.health_settings(&[]).expect("settings"));

    let unhealthy = report
        .components
        .iter()
        .filter(|component| !component.healthy)
        .map(|component| component.name.as_str())
        .collect::<Vec<_>>();
    assert!(unhealthy.is_empty(), "unhealthy components: {unhealthy:?}");
    assert_eq!(report.verdict, Verdict::Healthy);
    assert_eq!(report.verdict.exit_code(), 0);
}

#[test]
fn integration_health_check_degrades_when_ollama_is_down() {
    let ollama_server = MockServer::start();
    let neo4j_server = MockServer::start();
    ollama_server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(503).body("loading");
    });
    mock_neo4j(&neo4j_server);
    let temp = tempdir().expect("tempdir");
    let config = stack_config(&ollama_server, &neo4j_server, &temp.path().join("unused.sh"));
    let (docker, ollama, graph) = build_clients(&config, running_container());
    let probes = StackProbes {
        docker: &docker,
        ollama: &ollama,
        graph: &graph,
        sse_probe: &live_sse_probe,
    };

    let report = run_health_check(probes, &config.health_settings(&[]).expect("settings"));

    assert_eq!(report.verdict, Verdict::Degraded);
    let ollama_report = report
        .components
        .iter()
        .find(|component| component.name == "ollama")
        .expect("ollama component");
    assert!(!ollama_report.healthy);
    assert!(ollama_report.checks[0].code.starts_with("unreachable"));
}

#[test]
fn regression_health_check_is_unhealthy_without_docker_and_graph() {
    let ollama_server = MockServer::start();
    let neo4j_server = MockServer::start();
    mock_ollama(&ollama_server);
    neo4j_server.mock(|when, then| {
        when.method(POST).path("/db/neo4j/tx/commit");
        then.status(401).body("unauthorized");
    });
    let temp = tempdir().expect("tempdir");
    let config = stack_config(&ollama_server, &neo4j_server, &temp.path().join("unused.sh"));
    let runner = ScriptedCommandRunner::new().on_failure(
        "docker",
        &[],
        "Cannot connect to the Docker daemon",
    );
    let (docker, ollama, graph) = build_clients(&config, runner);
    let probes = StackProbes {
        docker: &docker,
        ollama: &ollama,
        graph: &graph,
        sse_probe: &live_sse_probe,
    };

    let report = run_health_check(probes, &config.health_settings(&[]).expect("settings"));

    assert_eq!(report.verdict, Verdict::Unhealthy);
    assert_eq!(report.verdict.exit_code(), 2);
}
