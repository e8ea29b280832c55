//! Suite runner grouping diagnostics and flows into unit, integration and
//! validation suites behind a container-running gate.

use std::time::{Duration, Instant};

use graphprobe_core::{elapsed_ms, now_epoch_ms};
use graphprobe_diagnostics::{
    build_status_report, check_docker_container, check_mcp_endpoint, check_neo4j, check_ollama,
    render_health_report, render_health_report_json, render_status_report,
    render_status_report_json, run_config_check, run_health_check, CheckResult, ComponentReport,
    ConfigExpectations, HealthReport, HealthSettings, StackProbes, StatusReport, StatusSettings,
};
use graphprobe_docker::CommandRunner;
use graphprobe_graph::CypherExecutor;
use graphprobe_mcp::{DynMcpClient, McpError};
use serde_json::json;

use crate::flows::{
    data_accessibility, memory_flow, tool_catalog, MemoryFlowSettings, SCENARIO_MEMORY_FLOW,
    SCENARIO_TOOL_CATALOG,
};
use crate::report::{render_scenario_report, ScenarioReport};

/// Opens a fresh, uninitialized client to the memory server.
pub type McpConnector<'a> = &'a dyn Fn() -> Result<DynMcpClient, McpError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteKind {
    Unit,
    Integration,
    Validation,
}

impl SuiteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SuiteKind::Unit => "unit",
            SuiteKind::Integration => "integration",
            SuiteKind::Validation => "validation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuiteSelection {
    Unit,
    Integration,
    Validation,
    #[default]
    All,
}

impl SuiteSelection {
    pub fn kinds(self) -> Vec<SuiteKind> {
        match self {
            SuiteSelection::Unit => vec![SuiteKind::Unit],
            SuiteSelection::Integration => vec![SuiteKind::Integration],
            SuiteSelection::Validation => vec![SuiteKind::Validation],
            SuiteSelection::All => vec![
                SuiteKind::Unit,
                SuiteKind::Integration,
                SuiteKind::Validation,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteSettings {
    pub health: HealthSettings,
    pub status: StatusSettings,
    pub expectations: ConfigExpectations,
    pub memory_flow: MemoryFlowSettings,
    pub include_reports: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteOutcome {
    pub kind: SuiteKind,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteOutcome {
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(|scenario| scenario.passed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub started_at_ms: i64,
    pub duration_ms: u64,
    pub gate: CheckResult,
    pub gate_passed: bool,
    pub suites: Vec<SuiteOutcome>,
    pub health: Option<HealthReport>,
    pub status: Option<StatusReport>,
}

impl SuiteReport {
    pub fn total(&self) -> usize {
        self.suites.iter().map(|suite| suite.scenarios.len()).sum()
    }

    pub fn passed_count(&self) -> usize {
        self.suites
            .iter()
            .flat_map(|suite| suite.scenarios.iter())
            .filter(|scenario| scenario.passed)
            .count()
    }

    /// Percentage of passed scenarios; 0 when nothing ran.
    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passed_count() as f64 * 100.0 / total as f64,
        }
    }

    pub fn passed(&self) -> bool {
        self.gate_passed && self.suites.iter().all(SuiteOutcome::passed)
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

fn connected_client(
    connect: McpConnector<'_>,
    scenario: &str,
) -> Result<DynMcpClient, ScenarioReport> {
    connect().map_err(|error| {
        let mut report = ScenarioReport::new(scenario);
        report.fail("connect", format!("{}: {error}", error.reason_code()));
        report
    })
}

fn run_unit<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
    settings: &SuiteSettings,
) -> Vec<ScenarioReport> {
    run_config_check(probes, &settings.expectations)
        .components
        .iter()
        .map(ScenarioReport::from_component)
        .collect()
}

fn run_integration<R: CommandRunner, G: CypherExecutor>(
    probes: StackProbes<'_, R, G>,
    settings: &SuiteSettings,
    connect: McpConnector<'_>,
) -> Vec<ScenarioReport> {
    let components: [ComponentReport; 3] = [
        check_ollama(probes, &settings.health),
        check_neo4j(probes, &settings.health),
        check_mcp_endpoint(probes, &settings.health),
    ];
    let mut scenarios = components
        .iter()
        .map(ScenarioReport::from_component)
        .collect::<Vec<_>>();
    scenarios.push(match connected_client(connect, SCENARIO_TOOL_CATALOG) {
        Ok(mut client) => tool_catalog(&mut client),
        Err(report) => report,
    });
    scenarios
}

fn run_validation<R, G: CypherExecutor>(
    probes: StackProbes<'_, R, G>,
    settings: &SuiteSettings,
    connect: McpConnector<'_>,
    sleeper: &mut dyn FnMut(Duration),
) -> Vec<ScenarioReport> {
    let now_ms = now_epoch_ms();
    let mut scenarios = vec![data_accessibility(
        probes.graph,
        &settings.memory_flow.group_id,
        now_ms,
    )];
    let flow = match connected_client(connect, SCENARIO_MEMORY_FLOW) {
        Ok(mut client) => match client.initialize() {
            Ok(_) => memory_flow(&mut client, probes.graph, &settings.memory_flow, sleeper),
            Err(error) => {
                let mut report = ScenarioReport::new(SCENARIO_MEMORY_FLOW);
                report.fail("initialize", format!("{}: {error}", error.reason_code()));
                report
            }
        },
        Err(report) => report,
    };
    scenarios.push(flow);
    scenarios
}

/// Runs the selected suites in order once the container gate passes.
#[tracing::instrument(skip_all, fields(selection = ?selection))]
pub fn run_suite<R: CommandRunner, G: CypherExecutor>(
    probes: StackProbes<'_, R, G>,
    settings: &SuiteSettings,
    connect: McpConnector<'_>,
    selection: SuiteSelection,
    sleeper: &mut dyn FnMut(Duration),
) -> SuiteReport {
    let started_at_ms = now_epoch_ms();
    let started = Instant::now();
    let container = check_docker_container(probes);
    let gate_passed = container.healthy;
    let gate = container
        .checks
        .into_iter()
        .next()
        .unwrap_or_else(|| CheckResult::fail("docker_container.running", "no_result"));

    let mut suites = Vec::new();
    if gate_passed {
        for kind in selection.kinds() {
            tracing::info!(suite = kind.as_str(), "suite started");
            let scenarios = match kind {
                SuiteKind::Unit => run_unit(probes, settings),
                SuiteKind::Integration => run_integration(probes, settings, connect),
                SuiteKind::Validation => run_validation(probes, settings, connect, sleeper),
            };
            let outcome = SuiteOutcome { kind, scenarios };
            tracing::info!(suite = kind.as_str(), passed = outcome.passed(), "suite finished");
            suites.push(outcome);
        }
    } else {
        tracing::warn!(code = %gate.code, "container gate failed, suites not run");
    }

    let (health, status) = if settings.include_reports {
        (
            Some(run_health_check(probes, &settings.health)),
            Some(build_status_report(probes, &settings.status)),
        )
    } else {
        (None, None)
    };

    SuiteReport {
        started_at_ms,
        duration_ms: elapsed_ms(started),
        gate,
        gate_passed,
        suites,
        health,
        status,
    }
}

pub fn render_suite_report(report: &SuiteReport) -> String {
    let total = report.total();
    let passed = report.passed_count();
    let mut lines = vec![format!(
        "suite summary: passed={} exit_code={} scenarios={} passed_scenarios={} \
         failed_scenarios={} success_rate={:.1} duration_ms={}",
        report.passed(),
        report.exit_code(),
        total,
        passed,
        total - passed,
        report.success_rate(),
        report.duration_ms,
    )];
    lines.push(format!(
        "suite gate: key={} status={} code={} target={}",
        report.gate.key,
        report.gate.status.as_str(),
        report.gate.code,
        report.gate.target.as_deref().unwrap_or("-"),
    ));
    for suite in &report.suites {
        lines.push(format!(
            "suite result: suite={} verdict={} scenarios={} failed={}",
            suite.kind.as_str(),
            if suite.passed() { "pass" } else { "fail" },
            suite.scenarios.len(),
            suite.scenarios.iter().filter(|scenario| !scenario.passed).count(),
        ));
        lines.extend(suite.scenarios.iter().map(render_scenario_report));
    }
    if let Some(health) = &report.health {
        lines.push(render_health_report(health));
    }
    if let Some(status) = &report.status {
        lines.push(render_status_report(status));
    }
    lines.join("\n")
}

pub fn render_suite_report_json(report: &SuiteReport) -> String {
    let parse = |rendered: String| serde_json::from_str::<serde_json::Value>(&rendered).ok();
    json!({
        "summary": {
            "passed": report.passed(),
            "exit_code": report.exit_code(),
            "scenarios": report.total(),
            "passed_scenarios": report.passed_count(),
            "success_rate": format!("{:.1}", report.success_rate()),
            "started_at_ms": report.started_at_ms,
            "duration_ms": report.duration_ms,
        },
        "gate": report.gate.to_json(),
        "suites": report
            .suites
            .iter()
            .map(|suite| {
                let scenarios = suite
                    .scenarios
                    .iter()
                    .map(ScenarioReport::to_json)
                    .collect::<Vec<_>>();
                json!({
                    "suite": suite.kind.as_str(),
                    "passed": suite.passed(),
                    "scenarios": scenarios,
                })
            })
            .collect::<Vec<_>>(),
        "health": report
            .health
            .as_ref()
            .and_then(|health| parse(render_health_report_json(health))),
        "status": report
            .status
            .as_ref()
            .and_then(|status| parse(render_status_report_json(status))),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use graphprobe_core::PollPolicy;
    use graphprobe_diagnostics::CheckStatus;
    use graphprobe_docker::{DockerCli, ScriptedCommandRunner};
    use graphprobe_graph::{QueryResult, ScriptedCypherExecutor};
    use graphprobe_llm::OllamaClient;
    use graphprobe_mcp::{McpClient, McpTransport, SseProbe};
    use serde_json::Value;

    use super::*;
    use crate::flows::tests::{episodes_result, FakeMemoryServer};
    use crate::memories::{run_scoped_name, SAMPLE_MEMORIES};

    const CONTAINER: &str = "mcp_server-graphiti-mcp-1";

    fn settings() -> SuiteSettings {
        SuiteSettings {
            health: HealthSettings {
                llm_model: "deepseek-r1:latest".to_string(),
                embedder_model: "mxbai-embed-large:latest".to_string(),
                embedding_dim: 4,
                group_id: "default".to_string(),
                mcp_sse_url: "http://127.0.0.1:8000/sse".to_string(),
                probe_timeout: Duration::from_millis(200),
                log_tail_lines: 20,
                skip: BTreeSet::new(),
            },
            status: StatusSettings {
                llm_model: "deepseek-r1:latest".to_string(),
                embedder_model: "mxbai-embed-large:latest".to_string(),
                group_id: "default".to_string(),
            },
            expectations: ConfigExpectations {
                env: Vec::new(),
                files: Vec::new(),
                modules: Vec::new(),
                mcp_port: None,
            },
            memory_flow: MemoryFlowSettings {
                group_id: "default".to_string(),
                run_id: "suite".to_string(),
                poll: PollPolicy {
                    attempts: 2,
                    interval: Duration::from_millis(1),
                },
                cleanup: false,
                search_limit: 5,
            },
            include_reports: false,
        }
    }

    fn unused_sse(_url: &str, _timeout: Duration) -> anyhow::Result<SseProbe> {
        anyhow::bail!("sse probe not expected")
    }

    fn fake_connector() -> Result<DynMcpClient, McpError> {
        let transport: Box<dyn McpTransport> =
            Box::new(FakeMemoryServer::new(&graphprobe_mcp::EXPECTED_MEMORY_TOOLS));
        Ok(McpClient::new(transport, Duration::from_secs(1)))
    }

    fn validation_graph() -> ScriptedCypherExecutor {
        let names = SAMPLE_MEMORIES
            .iter()
            .map(|memory| run_scoped_name(memory, "suite"))
            .collect::<Vec<_>>();
        let name_refs = names.iter().map(String::as_str).collect::<Vec<_>>();
        ScriptedCypherExecutor::new()
            .on("e.name IN $names", episodes_result(&name_refs))
            .on(
                "MATCH (e:Episodic {uuid: $uuid}) RETURN",
                QueryResult {
                    columns: ["uuid", "name", "content", "source", "created_at"]
                        .map(String::from)
                        .to_vec(),
                    rows: vec![vec![
                        Value::from("episode-1"),
                        Value::from("data_accessibility_validation"),
                        Value::from(
                            "Validation episode written by graphprobe to confirm graph reads \
                             and writes.",
                        ),
                        Value::from("validation"),
                        Value::from(1),
                    ]],
                },
            )
            .on_scalar("DETACH DELETE", "deleted", 1)
            .on_scalar("CREATE (e:Episodic", "uuid", "episode-1")
            .on(
                "OPTIONAL MATCH",
                QueryResult {
                    columns: ["uuid", "name", "summary", "connections"].map(String::from).to_vec(),
                    rows: vec![vec![
                        Value::from("u1"),
                        Value::from("TechCorp"),
                        Value::from(""),
                        Value::from(2),
                    ]],
                },
            )
            .on(
                "MATCH (a:Entity)-[r:RELATES_TO]->(b:Entity)",
                QueryResult {
                    columns: ["source_name", "relation", "target_name", "fact"]
                        .map(String::from)
                        .to_vec(),
                    rows: vec![vec![
                        Value::from("Alice Johnson"),
                        Value::from("works_at"),
                        Value::from("TechCorp"),
                        Value::from("Alice works at TechCorp"),
                    ]],
                },
            )
            .on_scalar("count(", "total", 7)
    }

    #[test]
    fn functional_suite_stops_at_container_gate() {
        let runner = ScriptedCommandRunner::new().on_success("docker", &["ps"], "");
        let docker = DockerCli::new(runner, "docker", CONTAINER, Duration::from_secs(1));
        let ollama =
            OllamaClient::new("http://127.0.0.1:9", Duration::from_millis(50)).expect("client");
        let graph = ScriptedCypherExecutor::new();
        let probes = StackProbes {
            docker: &docker,
            ollama: &ollama,
            graph: &graph,
            sse_probe: &unused_sse,
        };
        let connect = || -> Result<DynMcpClient, McpError> {
            Err(McpError::Closed("must not connect".to_string()))
        };
        let report = run_suite(probes, &settings(), &connect, SuiteSelection::All, &mut |_| {});
        assert!(!report.gate_passed);
        assert!(report.suites.is_empty());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.gate.code, "container_missing");
        assert!(graph.executed().is_empty());
        let rendered = render_suite_report(&report);
        assert!(rendered.contains(
            "suite gate: key=docker_container.running status=fail code=container_missing"
        ));
    }

    #[test]
    fn functional_validation_suite_runs_flows_against_fakes() {
        let runner = ScriptedCommandRunner::new().on_success(
            "docker",
            &["ps"],
            &format!("{CONTAINER}\tUp 3 hours\t0.0.0.0:8000->8000/tcp\n"),
        );
        let docker = DockerCli::new(runner, "docker", CONTAINER, Duration::from_secs(1));
        let ollama =
            OllamaClient::new("http://127.0.0.1:9", Duration::from_millis(50)).expect("client");
        let graph = validation_graph();
        let probes = StackProbes {
            docker: &docker,
            ollama: &ollama,
            graph: &graph,
            sse_probe: &unused_sse,
        };
        let report = run_suite(
            probes,
            &settings(),
            &fake_connector,
            SuiteSelection::Validation,
            &mut |_| {},
        );
        assert!(report.passed(), "{}", render_suite_report(&report));
        assert_eq!(report.total(), 2);
        assert_eq!(report.success_rate(), 100.0);
        let json: Value = serde_json::from_str(&render_suite_report_json(&report)).expect("json");
        assert_eq!(json["summary"]["success_rate"], "100.0");
        assert_eq!(json["suites"][0]["suite"], "validation");
        assert!(json["health"].is_null());
    }

    #[test]
    fn regression_failed_connection_fails_only_the_mcp_scenario() {
        let runner = ScriptedCommandRunner::new().on_success(
            "docker",
            &["ps"],
            &format!("{CONTAINER}\tUp 3 hours\t\n"),
        );
        let docker = DockerCli::new(runner, "docker", CONTAINER, Duration::from_secs(1));
        let ollama =
            OllamaClient::new("http://127.0.0.1:9", Duration::from_millis(50)).expect("client");
        let graph = validation_graph();
        let probes = StackProbes {
            docker: &docker,
            ollama: &ollama,
            graph: &graph,
            sse_probe: &unused_sse,
        };
        let connect = || -> Result<DynMcpClient, McpError> {
            Err(McpError::Transport("connection refused".to_string()))
        };
        let report = run_suite(
            probes,
            &settings(),
            &connect,
            SuiteSelection::Validation,
            &mut |_| {},
        );
        let suite = &report.suites[0];
        assert!(suite.scenarios[0].passed);
        assert!(!suite.scenarios[1].passed);
        assert_eq!(suite.scenarios[1].steps[0].name, "connect");
        assert_eq!(suite.scenarios[1].steps[0].status, CheckStatus::Fail);
        assert_eq!(format!("{:.1}", report.success_rate()), "50.0");
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn unit_selection_all_runs_suites_in_order() {
        assert_eq!(
            SuiteSelection::All.kinds(),
            vec![SuiteKind::Unit, SuiteKind::Integration, SuiteKind::Validation]
        );
        assert_eq!(SuiteSelection::default(), SuiteSelection::All);
    }
}
