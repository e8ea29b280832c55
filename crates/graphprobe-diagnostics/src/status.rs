use std::time::Instant;

use graphprobe_core::{elapsed_ms, preview, single_line};
use graphprobe_graph::{graph_stats, CypherExecutor, GraphStats};
use graphprobe_llm::{model_available, OllamaModel};
use serde::Serialize;
use serde_json::json;

use crate::checks::error_code;
use crate::probes::StackProbes;

const STATUS_PROMPT: &str = "Respond with exactly: status check ok";
const EMBED_PROMPT: &str = "status check";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One model liveness probe with its round-trip latency.
pub struct ModelLiveness {
    pub model: String,
    pub listed: bool,
    pub ok: bool,
    pub latency_ms: u64,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub ollama_url: String,
    pub ollama_reachable: bool,
    pub ollama_error: Option<String>,
    pub models: Vec<OllamaModel>,
    pub llm: ModelLiveness,
    pub embedder: ModelLiveness,
    pub group_id: String,
    pub graph: Option<GraphStats>,
    pub graph_error: Option<String>,
}

impl StatusReport {
    pub fn operational(&self) -> bool {
        self.ollama_reachable && self.llm.ok && self.embedder.ok && self.graph.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSettings {
    pub llm_model: String,
    pub embedder_model: String,
    pub group_id: String,
}

fn unreachable_model(model: &str) -> ModelLiveness {
    ModelLiveness {
        model: model.to_string(),
        listed: false,
        ok: false,
        latency_ms: 0,
        detail: "server_unreachable".to_string(),
    }
}

#[tracing::instrument(skip_all)]
pub fn build_status_report<R, G: CypherExecutor>(
    probes: StackProbes<'_, R, G>,
    settings: &StatusSettings,
) -> StatusReport {
    let ollama = probes.ollama;
    let (models, ollama_error) = match ollama.list_models() {
        Ok(models) => (Some(models), None),
        Err(error) => (None, Some(error_code("unreachable", &error))),
    };

    let (llm, embedder) = match models.as_deref() {
        Some(models) => {
            let started = Instant::now();
            let llm = match ollama.generate(&settings.llm_model, STATUS_PROMPT) {
                Ok(response) => ModelLiveness {
                    model: settings.llm_model.clone(),
                    listed: model_available(models, &settings.llm_model),
                    ok: true,
                    latency_ms: elapsed_ms(started),
                    detail: preview(&single_line(&response), 80),
                },
                Err(error) => ModelLiveness {
                    model: settings.llm_model.clone(),
                    listed: model_available(models, &settings.llm_model),
                    ok: false,
                    latency_ms: elapsed_ms(started),
                    detail: error_code("generate_failed", &error),
                },
            };
            let started = Instant::now();
            let embedder = match ollama.embed(&settings.embedder_model, EMBED_PROMPT) {
                Ok(vector) => ModelLiveness {
                    model: settings.embedder_model.clone(),
                    listed: model_available(models, &settings.embedder_model),
                    ok: true,
                    latency_ms: elapsed_ms(started),
                    detail: format!("dimension={}", vector.len()),
                },
                Err(error) => ModelLiveness {
                    model: settings.embedder_model.clone(),
                    listed: model_available(models, &settings.embedder_model),
                    ok: false,
                    latency_ms: elapsed_ms(started),
                    detail: error_code("embed_failed", &error),
                },
            };
            (llm, embedder)
        }
        None => (
            unreachable_model(&settings.llm_model),
            unreachable_model(&settings.embedder_model),
        ),
    };

    let (graph, graph_error) = match graph_stats(probes.graph, &settings.group_id) {
        Ok(stats) => (Some(stats), None),
        Err(error) => (None, Some(error_code("query_failed", &error))),
    };

    StatusReport {
        ollama_url: ollama.base_url().to_string(),
        ollama_reachable: models.is_some(),
        ollama_error,
        models: models.unwrap_or_default(),
        llm,
        embedder,
        group_id: settings.group_id.clone(),
        graph,
        graph_error,
    }
}

fn render_liveness(role: &str, probe: &ModelLiveness) -> String {
    format!(
        "status {role}: model={} listed={} ok={} latency_ms={} detail={}",
        probe.model, probe.listed, probe.ok, probe.latency_ms, probe.detail
    )
}

pub fn render_status_report(report: &StatusReport) -> String {
    let mut lines = vec![format!(
        "status summary: operational={} ollama_url={} reachable={} models={}",
        report.operational(),
        report.ollama_url,
        report.ollama_reachable,
        report.models.len(),
    )];
    if let Some(error) = report.ollama_error.as_deref() {
        lines.push(format!("status ollama: error={error}"));
    }
    for model in &report.models {
        lines.push(format!(
            "status model: name={} size_gb={:.1}",
            model.name,
            model.size as f64 / 1_000_000_000.0
        ));
    }
    lines.push(render_liveness("llm", &report.llm));
    lines.push(render_liveness("embedder", &report.embedder));
    match (&report.graph, report.graph_error.as_deref()) {
        (Some(stats), _) => lines.push(format!(
            "status graph: group_id={} nodes={} episodes={} entities={} relationships={}",
            report.group_id, stats.total_nodes, stats.episodes, stats.entities, stats.relationships
        )),
        (None, error) => lines.push(format!(
            "status graph: group_id={} error={}",
            report.group_id,
            error.unwrap_or("unknown")
        )),
    }
    lines.join("\n")
}

pub fn render_status_report_json(report: &StatusReport) -> String {
    json!({
        "operational": report.operational(),
        "report": report,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use graphprobe_docker::{DockerCli, ScriptedCommandRunner};
    use graphprobe_graph::ScriptedCypherExecutor;
    use graphprobe_llm::OllamaClient;
    use httpmock::MockServer;

    use super::*;
    use crate::health::tests::{healthy_graph, live_sse, mock_ollama, CONTAINER};

    fn settings() -> StatusSettings {
        StatusSettings {
            llm_model: "deepseek-r1:latest".to_string(),
            embedder_model: "mxbai-embed-large:latest".to_string(),
            group_id: "default".to_string(),
        }
    }

    #[test]
    fn functional_status_report_collects_models_liveness_and_stats() {
        let server = MockServer::start();
        mock_ollama(&server, 1024);
        let runner = ScriptedCommandRunner::new();
        let docker = DockerCli::new(&runner, "docker", CONTAINER, Duration::from_secs(1));
        let ollama = OllamaClient::new(&server.base_url(), Duration::from_secs(5)).expect("ollama");
        let graph = healthy_graph();
        let report = build_status_report(
            StackProbes {
                docker: &docker,
                ollama: &ollama,
                graph: &graph,
                sse_probe: &live_sse,
            },
            &settings(),
        );
        assert!(report.operational());
        assert_eq!(report.models.len(), 2);
        assert_eq!(report.embedder.detail, "dimension=1024");
        assert_eq!(report.graph.map(|stats| stats.episodes), Some(3));
        let rendered = render_status_report(&report);
        assert!(rendered.contains("status llm: model=deepseek-r1:latest listed=true ok=true"));
        assert!(rendered.contains("status graph: group_id=default nodes=7"));
    }

    #[test]
    fn regression_status_report_survives_unreachable_services() {
        let runner = ScriptedCommandRunner::new();
        let docker = DockerCli::new(&runner, "docker", CONTAINER, Duration::from_secs(1));
        let ollama =
            OllamaClient::new("http://127.0.0.1:9", Duration::from_millis(500)).expect("ollama");
        let graph = ScriptedCypherExecutor::new();
        let report = build_status_report(
            StackProbes {
                docker: &docker,
                ollama: &ollama,
                graph: &graph,
                sse_probe: &live_sse,
            },
            &settings(),
        );
        assert!(!report.operational());
        assert_eq!(report.llm.detail, "server_unreachable");
        assert!(report.graph_error.is_some());
        let json: serde_json::Value =
            serde_json::from_str(&render_status_report_json(&report)).expect("json");
        assert_eq!(json["operational"], false);
        assert_eq!(json["report"]["ollama_reachable"], false);
    }
}
