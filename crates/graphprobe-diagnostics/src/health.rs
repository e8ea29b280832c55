use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use graphprobe_core::elapsed_ms;
use graphprobe_docker::CommandRunner;
use graphprobe_graph::{graph_stats, ping, write_probe, CypherExecutor};
use graphprobe_llm::model_available;
use serde::Serialize;
use serde_json::json;

use crate::checks::{
    count_checks, error_code, render_component_lines, CheckResult, ComponentReport,
};
use crate::probes::StackProbes;

pub const COMPONENT_DOCKER_CONTAINER: &str = "docker_container";
pub const COMPONENT_OLLAMA: &str = "ollama";
pub const COMPONENT_MCP_SERVER_INIT: &str = "mcp_server_init";
pub const COMPONENT_NEO4J: &str = "neo4j";
pub const COMPONENT_MCP_ENDPOINT: &str = "mcp_endpoint";

pub const HEALTH_COMPONENTS: [&str; 5] = [
    COMPONENT_DOCKER_CONTAINER,
    COMPONENT_OLLAMA,
    COMPONENT_MCP_SERVER_INIT,
    COMPONENT_NEO4J,
    COMPONENT_MCP_ENDPOINT,
];

pub const DEFAULT_LOG_TAIL_LINES: usize = 20;
/// Markers required among the four server-initialization log lines.
pub const LOG_MARKER_QUORUM: usize = 3;
/// Healthy components needed for a degraded rather than unhealthy verdict.
pub const DEGRADED_HEALTHY_MINIMUM: usize = 3;

const GENERATE_PROMPT: &str = "Hello, respond with just 'OK'";
const EMBED_PROMPT: &str = "This is a test sentence for embedding.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSettings {
    pub llm_model: String,
    pub embedder_model: String,
    pub embedding_dim: usize,
    pub group_id: String,
    pub mcp_sse_url: String,
    pub probe_timeout: Duration,
    pub log_tail_lines: usize,
    pub skip: BTreeSet<String>,
}

impl HealthSettings {
    pub fn expected_log_markers(&self) -> Vec<String> {
        vec![
            "Graphiti client initialized successfully".to_string(),
            format!("Using OpenAI model: {}", self.llm_model),
            "Running MCP server with SSE transport".to_string(),
            "Uvicorn running on".to_string(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Healthy,
    Degraded,
    Unhealthy,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Healthy => "healthy",
            Verdict::Degraded => "degraded",
            Verdict::Unhealthy => "unhealthy",
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Healthy => 0,
            Verdict::Degraded => 1,
            Verdict::Unhealthy => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub started_at: String,
    pub duration_ms: u64,
    pub components: Vec<ComponentReport>,
    pub verdict: Verdict,
}

/// Skipped components are ignored; the rest decide the verdict.
pub fn evaluate_verdict(components: &[ComponentReport]) -> Verdict {
    let evaluated = components
        .iter()
        .filter(|component| !component.skipped)
        .collect::<Vec<_>>();
    let healthy = evaluated.iter().filter(|component| component.healthy).count();
    if healthy == evaluated.len() {
        Verdict::Healthy
    } else if healthy >= DEGRADED_HEALTHY_MINIMUM {
        Verdict::Degraded
    } else {
        Verdict::Unhealthy
    }
}

pub fn check_docker_container<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
) -> ComponentReport {
    let container = probes.docker.container().to_string();
    let key = format!("{COMPONENT_DOCKER_CONTAINER}.running");
    let check = match probes.docker.container_status() {
        Ok(Some(status)) if status.running => CheckResult::pass(key, "running")
            .with_target(format!("{} ({})", status.name, status.status)),
        Ok(Some(status)) => CheckResult::fail(key, "not_running")
            .with_target(format!("{} ({})", status.name, status.status))
            .with_action(format!("docker start {container}")),
        Ok(None) => CheckResult::fail(key, "container_missing")
            .with_target(container.clone())
            .with_action("start the memory server stack with docker compose up -d"),
        Err(error) => CheckResult::fail(key, error_code("docker_unavailable", &error))
            .with_target(container.clone()),
    };
    ComponentReport::from_checks(COMPONENT_DOCKER_CONTAINER, vec![check])
}

pub fn check_ollama<R, G>(
    probes: StackProbes<'_, R, G>,
    settings: &HealthSettings,
) -> ComponentReport {
    let ollama = probes.ollama;
    let base = ollama.base_url().to_string();
    let mut checks = Vec::new();
    let models = match ollama.list_models() {
        Ok(models) => {
            checks.push(
                CheckResult::pass(
                    format!("{COMPONENT_OLLAMA}.server"),
                    format!("models={}", models.len()),
                )
                .with_target(base.clone()),
            );
            models
        }
        Err(error) => {
            checks.push(
                CheckResult::fail(
                    format!("{COMPONENT_OLLAMA}.server"),
                    error_code("unreachable", &error),
                )
                .with_target(base)
                .with_action("start ollama or point --ollama-url at a running server"),
            );
            return ComponentReport::from_checks(COMPONENT_OLLAMA, checks);
        }
    };

    let llm = settings.llm_model.as_str();
    checks.push(listed_check("llm_model", &models, llm));
    let started = Instant::now();
    checks.push(match ollama.generate(llm, GENERATE_PROMPT) {
        Ok(response) => CheckResult::pass(
            format!("{COMPONENT_OLLAMA}.llm_model.generate"),
            format!("latency_ms={}", elapsed_ms(started)),
        )
        .with_target(format!("{llm} chars={}", response.chars().count())),
        Err(error) => CheckResult::fail(
            format!("{COMPONENT_OLLAMA}.llm_model.generate"),
            error_code("generate_failed", &error),
        )
        .with_target(llm),
    });

    let embedder = settings.embedder_model.as_str();
    checks.push(listed_check("embedder_model", &models, embedder));
    checks.push(match ollama.embed(embedder, EMBED_PROMPT) {
        Ok(vector) if vector.len() == settings.embedding_dim => CheckResult::pass(
            format!("{COMPONENT_OLLAMA}.embedder_model.embed"),
            format!("dimension={}", vector.len()),
        )
        .with_target(embedder),
        Ok(vector) => CheckResult::fail(
            format!("{COMPONENT_OLLAMA}.embedder_model.embed"),
            format!(
                "dimension_mismatch:expected={},actual={}",
                settings.embedding_dim,
                vector.len()
            ),
        )
        .with_target(embedder)
        .with_action("set EMBEDDING_DIM to the embedder's output dimension"),
        Err(error) => CheckResult::fail(
            format!("{COMPONENT_OLLAMA}.embedder_model.embed"),
            error_code("embed_failed", &error),
        )
        .with_target(embedder),
    });
    ComponentReport::from_checks(COMPONENT_OLLAMA, checks)
}

fn listed_check(role: &str, models: &[graphprobe_llm::OllamaModel], name: &str) -> CheckResult {
    let key = format!("{COMPONENT_OLLAMA}.{role}.listed");
    if model_available(models, name) {
        CheckResult::pass(key, "listed").with_target(name)
    } else {
        CheckResult::fail(key, "model_missing")
            .with_target(name)
            .with_action(format!("ollama pull {name}"))
    }
}

/// Quorum rule: healthy with at least three of the four markers present.
pub fn check_mcp_server_init<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
    settings: &HealthSettings,
) -> ComponentReport {
    let logs = match probes.docker.logs_tail(settings.log_tail_lines) {
        Ok(logs) => logs,
        Err(error) => {
            return ComponentReport::from_checks(
                COMPONENT_MCP_SERVER_INIT,
                vec![CheckResult::fail(
                    format!("{COMPONENT_MCP_SERVER_INIT}.logs"),
                    error_code("logs_unavailable", &error),
                )
                .with_target(probes.docker.container())],
            )
        }
    };
    evaluate_log_markers(&logs, &settings.expected_log_markers())
}

pub fn evaluate_log_markers(logs: &str, markers: &[String]) -> ComponentReport {
    let present = markers
        .iter()
        .filter(|marker| logs.contains(marker.as_str()))
        .count();
    let quorum = present >= LOG_MARKER_QUORUM.min(markers.len());
    let checks = markers
        .iter()
        .enumerate()
        .map(|(index, marker)| {
            let key = format!("{COMPONENT_MCP_SERVER_INIT}.marker.{}", index + 1);
            if logs.contains(marker.as_str()) {
                CheckResult::pass(key, "present").with_target(marker.clone())
            } else if quorum {
                CheckResult::warn(key, "missing").with_target(marker.clone())
            } else {
                CheckResult::fail(key, "missing")
                    .with_target(marker.clone())
                    .with_action("inspect docker logs for server startup errors")
            }
        })
        .collect::<Vec<_>>();
    ComponentReport {
        name: COMPONENT_MCP_SERVER_INIT.to_string(),
        checks,
        healthy: quorum,
        skipped: false,
    }
}

pub fn check_neo4j<R, G: CypherExecutor>(
    probes: StackProbes<'_, R, G>,
    settings: &HealthSettings,
) -> ComponentReport {
    let graph = probes.graph;
    let mut checks = Vec::new();
    if let Err(error) = ping(graph) {
        checks.push(
            CheckResult::fail(
                format!("{COMPONENT_NEO4J}.connectivity"),
                error_code("unreachable", &error),
            )
            .with_action("verify NEO4J_URI, NEO4J_USER and NEO4J_PASSWORD"),
        );
        return ComponentReport::from_checks(COMPONENT_NEO4J, checks);
    }
    checks.push(CheckResult::pass(format!("{COMPONENT_NEO4J}.connectivity"), "connected"));
    checks.push(match graph_stats(graph, &settings.group_id) {
        Ok(stats) => CheckResult::pass(
            format!("{COMPONENT_NEO4J}.stats"),
            format!(
                "nodes={},episodes={},entities={},relationships={}",
                stats.total_nodes, stats.episodes, stats.entities, stats.relationships
            ),
        )
        .with_target(format!("group_id={}", settings.group_id)),
        Err(error) => CheckResult::fail(
            format!("{COMPONENT_NEO4J}.stats"),
            error_code("query_failed", &error),
        )
        .with_target(format!("group_id={}", settings.group_id)),
    });
    checks.push(match write_probe(graph, &settings.group_id) {
        Ok(probe) if probe.created && probe.deleted => {
            CheckResult::pass(format!("{COMPONENT_NEO4J}.write"), "write_delete_ok")
        }
        Ok(probe) => CheckResult::fail(
            format!("{COMPONENT_NEO4J}.write"),
            format!("write_incomplete:created={},deleted={}", probe.created, probe.deleted),
        ),
        Err(error) => CheckResult::fail(
            format!("{COMPONENT_NEO4J}.write"),
            error_code("write_failed", &error),
        )
        .with_action("check that the neo4j user has write access"),
    });
    ComponentReport::from_checks(COMPONENT_NEO4J, checks)
}

pub fn check_mcp_endpoint<R, G>(
    probes: StackProbes<'_, R, G>,
    settings: &HealthSettings,
) -> ComponentReport {
    let key = format!("{COMPONENT_MCP_ENDPOINT}.sse");
    let url = settings.mcp_sse_url.as_str();
    let check = match (probes.sse_probe)(url, settings.probe_timeout) {
        Ok(probe) if probe.reachable => {
            CheckResult::pass(key, format!("status={}", probe.status)).with_target(url)
        }
        Ok(probe) if probe.status >= 200 && probe.status < 300 => CheckResult::fail(
            key,
            format!("unexpected_content_type:{}", probe.content_type),
        )
        .with_target(url),
        Ok(probe) => {
            CheckResult::fail(key, format!("http_status:{}", probe.status)).with_target(url)
        }
        Err(error) => CheckResult::fail(key, error_code("unreachable", &error))
            .with_target(url)
            .with_action("verify the MCP server port is published"),
    };
    ComponentReport::from_checks(COMPONENT_MCP_ENDPOINT, vec![check])
}

/// Runs every component in order; a failing component never stops the rest.
#[tracing::instrument(skip_all)]
pub fn run_health_check<R: CommandRunner, G: CypherExecutor>(
    probes: StackProbes<'_, R, G>,
    settings: &HealthSettings,
) -> HealthReport {
    let started_at = chrono::Utc::now().to_rfc3339();
    let started = Instant::now();
    let components = HEALTH_COMPONENTS
        .iter()
        .map(|name| {
            if settings.skip.contains(*name) {
                tracing::info!(component = name, "health component skipped");
                return ComponentReport::skipped(name);
            }
            let report = match *name {
                COMPONENT_DOCKER_CONTAINER => check_docker_container(probes),
                COMPONENT_OLLAMA => check_ollama(probes, settings),
                COMPONENT_MCP_SERVER_INIT => check_mcp_server_init(probes, settings),
                COMPONENT_NEO4J => check_neo4j(probes, settings),
                _ => check_mcp_endpoint(probes, settings),
            };
            tracing::info!(
                component = name,
                healthy = report.healthy,
                "health component evaluated"
            );
            report
        })
        .collect::<Vec<_>>();
    let verdict = evaluate_verdict(&components);
    HealthReport {
        started_at,
        duration_ms: elapsed_ms(started),
        components,
        verdict,
    }
}

pub fn render_health_report(report: &HealthReport) -> String {
    let healthy = report.components.iter().filter(|c| c.healthy).count();
    let skipped = report.components.iter().filter(|c| c.skipped).count();
    let failed = report.components.len() - healthy - skipped;
    let counts = count_checks(report.components.iter().flat_map(|c| c.checks.iter()));
    let mut lines = vec![format!(
        "health summary: verdict={} exit_code={} components={} healthy={} failed={} skipped={} \
         checks={} pass={} warn={} fail={} started_at={} duration_ms={}",
        report.verdict.as_str(),
        report.verdict.exit_code(),
        report.components.len(),
        healthy,
        failed,
        skipped,
        counts.total(),
        counts.pass,
        counts.warn,
        counts.fail,
        report.started_at,
        report.duration_ms,
    )];
    lines.extend(render_component_lines("health", &report.components));
    lines.join("\n")
}

pub fn render_health_report_json(report: &HealthReport) -> String {
    let counts = count_checks(report.components.iter().flat_map(|c| c.checks.iter()));
    json!({
        "summary": {
            "verdict": report.verdict.as_str(),
            "exit_code": report.verdict.exit_code(),
            "started_at": report.started_at,
            "duration_ms": report.duration_ms,
            "components": report.components.len(),
            "healthy": report.components.iter().filter(|c| c.healthy).count(),
            "checks": counts.total(),
            "pass": counts.pass,
            "warn": counts.warn,
            "fail": counts.fail,
        },
        "components": report
            .components
            .iter()
            .map(ComponentReport::to_json)
            .collect::<Vec<_>>(),
    })
    .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use anyhow::bail;
    use graphprobe_docker::{DockerCli, ScriptedCommandRunner};
    use graphprobe_graph::ScriptedCypherExecutor;
    use graphprobe_llm::OllamaClient;
    use graphprobe_mcp::SseProbe;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    use super::*;
    use crate::checks::CheckStatus;

    pub(crate) const CONTAINER: &str = "mcp_server-graphiti-mcp-1";

    pub(crate) fn settings() -> HealthSettings {
        HealthSettings {
            llm_model: "deepseek-r1:latest".to_string(),
            embedder_model: "mxbai-embed-large:latest".to_string(),
            embedding_dim: 4,
            group_id: "default".to_string(),
            mcp_sse_url: "http://localhost:8000/sse".to_string(),
            probe_timeout: Duration::from_secs(1),
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            skip: BTreeSet::new(),
        }
    }

    pub(crate) fn healthy_logs() -> String {
        [
            "INFO Graphiti client initialized successfully",
            "INFO Using OpenAI model: deepseek-r1:latest",
            "INFO Running MCP server with SSE transport on 0.0.0.0:8000",
            "INFO:     Uvicorn running on http://0.0.0.0:8000 (Press CTRL+C to quit)",
        ]
        .join("\n")
    }

    pub(crate) fn running_docker(logs: &str) -> ScriptedCommandRunner {
        ScriptedCommandRunner::new()
            .on_success(
                "docker",
                &["ps"],
                &format!("{CONTAINER}\tUp 2 hours\t0.0.0.0:8000->8000/tcp\n"),
            )
            .on_success("docker", &["logs"], logs)
    }

    pub(crate) fn healthy_graph() -> ScriptedCypherExecutor {
        ScriptedCypherExecutor::new()
            .on_scalar("RETURN 1 AS test", "test", 1)
            .on_scalar("CREATE (p:HealthProbe", "total", 1)
            .on_scalar("MATCH (p:HealthProbe", "total", 1)
            .on_scalar("MATCH (e:Episodic)", "total", 3)
            .on_scalar("MATCH (e:Entity)", "total", 4)
            .on_scalar("RELATES_TO", "total", 5)
            .on_scalar("MATCH (n)", "total", 7)
    }

    pub(crate) fn mock_ollama(server: &MockServer, dimension: usize) {
        server.mock(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200).json_body(json!({
                "models": [
                    {"name": "deepseek-r1:latest", "size": 1},
                    {"name": "mxbai-embed-large:latest", "size": 1}
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).json_body(json!({"response": "OK"}));
        });
        let embedding = vec![0.5_f32; dimension];
        server.mock(move |when, then| {
            when.method(POST).path("/api/embeddings");
            then.status(200).json_body(json!({ "embedding": embedding }));
        });
    }

    pub(crate) fn live_sse(_url: &str, _timeout: Duration) -> anyhow::Result<SseProbe> {
        Ok(SseProbe {
            status: 200,
            content_type: "text/event-stream".to_string(),
            reachable: true,
        })
    }

    fn refused_sse(_url: &str, _timeout: Duration) -> anyhow::Result<SseProbe> {
        bail!("mcp sse probe request failed: connection refused")
    }

    fn docker_cli(runner: &ScriptedCommandRunner) -> DockerCli<&ScriptedCommandRunner> {
        DockerCli::new(runner, "docker", CONTAINER, Duration::from_secs(5))
    }

    #[test]
    fn unit_verdict_maps_healthy_counts_to_exit_codes() {
        let ok =
            |name: &str| ComponentReport::from_checks(name, vec![CheckResult::pass("k", "ok")]);
        let bad =
            |name: &str| ComponentReport::from_checks(name, vec![CheckResult::fail("k", "bad")]);
        let all = vec![ok("a"), ok("b"), ok("c"), ok("d"), ok("e")];
        assert_eq!(evaluate_verdict(&all), Verdict::Healthy);
        let three = vec![ok("a"), ok("b"), ok("c"), bad("d"), bad("e")];
        assert_eq!(evaluate_verdict(&three), Verdict::Degraded);
        assert_eq!(Verdict::Degraded.exit_code(), 1);
        let two = vec![ok("a"), ok("b"), bad("c"), bad("d"), bad("e")];
        assert_eq!(evaluate_verdict(&two), Verdict::Unhealthy);
        assert_eq!(Verdict::Unhealthy.exit_code(), 2);
    }

    #[test]
    fn unit_verdict_ignores_skipped_components() {
        let ok = ComponentReport::from_checks("a", vec![CheckResult::pass("k", "ok")]);
        let components = vec![ok, ComponentReport::skipped("b")];
        assert_eq!(evaluate_verdict(&components), Verdict::Healthy);
    }

    #[test]
    fn unit_log_markers_quorum_downgrades_missing_marker_to_warn() {
        let markers = settings().expected_log_markers();
        let logs = "Graphiti client initialized successfully\n\
                    Using OpenAI model: deepseek-r1:latest\n\
                    Uvicorn running on http://0.0.0.0:8000";
        let report = evaluate_log_markers(logs, &markers);
        assert!(report.healthy);
        assert_eq!(report.checks[2].status, CheckStatus::Warn);

        let report = evaluate_log_markers("Uvicorn running on", &markers);
        assert!(!report.healthy);
        assert_eq!(report.checks[0].status, CheckStatus::Fail);
        assert_eq!(report.checks[3].status, CheckStatus::Pass);
    }

    #[test]
    fn functional_health_check_all_components_healthy() {
        let server = MockServer::start();
        mock_ollama(&server, 4);
        let runner = running_docker(&healthy_logs());
        let docker = docker_cli(&runner);
        let ollama = OllamaClient::new(&server.base_url(), Duration::from_secs(5)).expect("ollama");
        let graph = healthy_graph();
        let probes = StackProbes {
            docker: &docker,
            ollama: &ollama,
            graph: &graph,
            sse_probe: &live_sse,
        };
        let report = run_health_check(probes, &settings());
        assert_eq!(report.verdict, Verdict::Healthy, "{}", render_health_report(&report));
        let neo4j = &report.components[3];
        assert_eq!(neo4j.checks[1].code, "nodes=7,episodes=3,entities=4,relationships=5");
        let rendered = render_health_report(&report);
        assert!(rendered
            .starts_with("health summary: verdict=healthy exit_code=0 components=5 healthy=5"));
    }

    #[test]
    fn functional_embedding_dimension_mismatch_fails_ollama() {
        let server = MockServer::start();
        mock_ollama(&server, 3);
        let runner = running_docker(&healthy_logs());
        let docker = docker_cli(&runner);
        let ollama = OllamaClient::new(&server.base_url(), Duration::from_secs(5)).expect("ollama");
        let graph = healthy_graph();
        let probes = StackProbes {
            docker: &docker,
            ollama: &ollama,
            graph: &graph,
            sse_probe: &live_sse,
        };
        let component = check_ollama(probes, &settings());
        assert!(!component.healthy);
        let embed = component
            .checks
            .iter()
            .find(|check| check.key == "ollama.embedder_model.embed")
            .expect("embed check");
        assert_eq!(embed.code, "dimension_mismatch:expected=4,actual=3");
    }

    #[test]
    fn integration_failures_continue_and_produce_unhealthy_verdict() {
        let runner = ScriptedCommandRunner::new()
            .on_success("docker", &["ps"], "")
            .on_failure("docker", &["logs"], "Error: No such container");
        let docker = docker_cli(&runner);
        let ollama =
            OllamaClient::new("http://127.0.0.1:9", Duration::from_millis(500)).expect("ollama");
        let graph = ScriptedCypherExecutor::new();
        let probes = StackProbes {
            docker: &docker,
            ollama: &ollama,
            graph: &graph,
            sse_probe: &refused_sse,
        };
        let mut settings = settings();
        settings.skip.insert(COMPONENT_MCP_SERVER_INIT.to_string());
        let report = run_health_check(probes, &settings);
        assert_eq!(report.components.len(), 5);
        assert_eq!(report.verdict, Verdict::Unhealthy);
        assert_eq!(report.components[0].checks[0].code, "container_missing");
        assert!(report.components[2].skipped);
        assert!(report.components[4].checks[0].code.starts_with("unreachable:"));
        let json = render_health_report_json(&report);
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["summary"]["exit_code"], 2);
    }
}
