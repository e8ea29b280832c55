//! End-to-end validation flows over the memory server and the graph.
//!
//! Flows never return errors: every failed call becomes a failed step so a
//! suite can report all flows of a run.

use std::collections::BTreeSet;
use std::time::Duration;

use graphprobe_core::{poll_until, preview, PollOutcome, PollPolicy};
use graphprobe_graph::queries::{
    create_episode, delete_episode, entities, episode_by_uuid, episodes_by_source, episodes_named,
    episodes_with_sources, facts, graph_stats, EpisodeDraft, EpisodeRecord, GraphStats,
};
use graphprobe_graph::{seed, CypherExecutor, SampleDataset};
use graphprobe_mcp::{missing_tools, AddMemoryRequest, McpClient, McpTransport, ToolCallOutcome};
use serde_json::Value;

use crate::memories::{run_scoped_name, SAMPLE_MEMORIES, SAMPLE_SEARCHES};
use crate::report::ScenarioReport;

pub const SCENARIO_TOOL_CATALOG: &str = "tool_catalog";
pub const SCENARIO_MEMORY_FLOW: &str = "memory_flow";
pub const SCENARIO_DATA_ACCESSIBILITY: &str = "data_accessibility";
pub const SCENARIO_SEED_SAMPLE: &str = "seed_sample";
pub const SCENARIO_VERIFY_MEMORIES: &str = "verify_memories";

const DETAIL_PREVIEW_CHARS: usize = 80;
const SAMPLE_LIMIT: usize = 5;

fn stats_detail(stats: &GraphStats) -> String {
    format!(
        "nodes={} episodes={} entities={} relationships={}",
        stats.total_nodes, stats.episodes, stats.entities, stats.relationships
    )
}

/// Length of `key` in the tool payload, when the server returned one.
fn payload_len(outcome: &ToolCallOutcome, key: &str) -> Option<usize> {
    let payload = outcome.payload()?;
    match &payload {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => map.get(key).and_then(Value::as_array).map(Vec::len),
        _ => None,
    }
}

pub fn tool_catalog<T: McpTransport>(client: &mut McpClient<T>) -> ScenarioReport {
    let mut report = ScenarioReport::new(SCENARIO_TOOL_CATALOG);
    match client.initialize() {
        Ok(info) => report.pass(
            "initialize",
            format!(
                "server={} version={} protocol={}",
                info.name, info.version, info.protocol_version
            ),
        ),
        Err(error) => {
            report.fail("initialize", format!("{}: {error}", error.reason_code()));
            return report;
        }
    }
    match client.list_tools() {
        Ok(catalog) => {
            report.pass("tools.list", format!("{} tools", catalog.len()));
            let missing = missing_tools(&catalog);
            if missing.is_empty() {
                report.pass("tools.expected", "all memory tools present");
            } else {
                report.fail("tools.expected", format!("missing: {}", missing.join(",")));
            }
        }
        Err(error) => report.fail("tools.list", format!("{}: {error}", error.reason_code())),
    }
    match client.get_status() {
        Ok(outcome) => report.pass("get_status", preview(&outcome.text, DETAIL_PREVIEW_CHARS)),
        Err(error) => report.fail("get_status", format!("{}: {error}", error.reason_code())),
    }
    report
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFlowSettings {
    pub group_id: String,
    /// Suffix keeping episode names unique per run.
    pub run_id: String,
    pub poll: PollPolicy,
    pub cleanup: bool,
    pub search_limit: usize,
}

impl MemoryFlowSettings {
    pub fn new(group_id: &str) -> Self {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            group_id: group_id.to_string(),
            run_id: run_id.chars().take(8).collect(),
            poll: PollPolicy::default(),
            cleanup: true,
            search_limit: 10,
        }
    }
}

fn distinct_names(records: &[EpisodeRecord]) -> usize {
    records
        .iter()
        .map(|record| record.name.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Adds the sample memories, waits for ingestion, then searches them.
///
/// The client is expected to be initialized already.
#[tracing::instrument(skip_all, fields(group_id = %settings.group_id, run_id = %settings.run_id))]
pub fn memory_flow<T: McpTransport, G: CypherExecutor>(
    client: &mut McpClient<T>,
    graph: &G,
    settings: &MemoryFlowSettings,
    sleeper: &mut dyn FnMut(Duration),
) -> ScenarioReport {
    let mut report = ScenarioReport::new(SCENARIO_MEMORY_FLOW);
    let mut queued = Vec::new();
    for memory in &SAMPLE_MEMORIES {
        let name = run_scoped_name(memory, &settings.run_id);
        let request = AddMemoryRequest::text(&name, memory.content, memory.source_description)
            .with_group(&settings.group_id);
        match client.add_memory(&request) {
            Ok(outcome) => {
                report.pass(
                    format!("add_memory.{}", memory.name),
                    preview(&outcome.text, DETAIL_PREVIEW_CHARS),
                );
                queued.push(name);
            }
            Err(error) => report.fail(
                format!("add_memory.{}", memory.name),
                format!("{}: {error}", error.reason_code()),
            ),
        }
    }
    if queued.is_empty() {
        report.fail("graph.ingested", "no memory was accepted");
        return report;
    }

    let mut last_found = Vec::new();
    let outcome = poll_until(settings.poll, &mut *sleeper, |attempt| {
        let found = episodes_named(graph, &settings.group_id, &queued)?;
        let visible = distinct_names(&found);
        tracing::debug!(
            attempt,
            visible,
            expected = queued.len(),
            "waiting for ingestion"
        );
        if visible >= queued.len() {
            return Ok(Some(found));
        }
        last_found = found;
        Ok(None)
    });
    let ingested = match outcome {
        Ok(PollOutcome::Ready { value, attempts }) => {
            report.pass(
                "graph.ingested",
                format!("{} episodes visible after {attempts} attempts", queued.len()),
            );
            Some(value)
        }
        Ok(PollOutcome::Exhausted { attempts }) => {
            report.fail(
                "graph.ingested",
                format!(
                    "{} of {} episodes visible after {attempts} attempts",
                    distinct_names(&last_found),
                    queued.len()
                ),
            );
            None
        }
        Err(error) => {
            report.fail("graph.ingested", format!("graph_query_failed: {error}"));
            None
        }
    };

    let groups = vec![settings.group_id.clone()];
    for (index, query) in SAMPLE_SEARCHES.iter().enumerate() {
        let step = index + 1;
        let key = format!("search.nodes.{step}");
        match client.search_memory_nodes(query, &groups, settings.search_limit) {
            Ok(outcome) => match payload_len(&outcome, "nodes") {
                Some(0) => report.warn(key, format!("no nodes for '{query}'")),
                Some(count) => report.pass(key, format!("{count} nodes for '{query}'")),
                None => report.pass(key, preview(&outcome.text, DETAIL_PREVIEW_CHARS)),
            },
            Err(error) => report.fail(key, format!("{}: {error}", error.reason_code())),
        }
        let key = format!("search.facts.{step}");
        match client.search_memory_facts(query, &groups, settings.search_limit) {
            Ok(outcome) => match payload_len(&outcome, "facts") {
                Some(0) => report.warn(key, format!("no facts for '{query}'")),
                Some(count) => report.pass(key, format!("{count} facts for '{query}'")),
                None => report.pass(key, preview(&outcome.text, DETAIL_PREVIEW_CHARS)),
            },
            Err(error) => report.fail(key, format!("{}: {error}", error.reason_code())),
        }
    }

    match client.get_episodes(&settings.group_id, settings.search_limit) {
        Ok(outcome) => match payload_len(&outcome, "episodes") {
            Some(count) => report.pass("get_episodes", format!("{count} episodes")),
            None => report.pass("get_episodes", preview(&outcome.text, DETAIL_PREVIEW_CHARS)),
        },
        Err(error) => report.fail("get_episodes", format!("{}: {error}", error.reason_code())),
    }

    if settings.cleanup {
        // Partially ingested runs still leave episodes behind; look them up again.
        let leftovers = match ingested {
            Some(records) => records,
            None => episodes_named(graph, &settings.group_id, &queued).unwrap_or_else(|error| {
                tracing::warn!(%error, "cleanup lookup failed, using last poll result");
                last_found
            }),
        };
        for episode in &leftovers {
            match client.delete_episode(&episode.uuid) {
                Ok(_) => report.pass(format!("cleanup.{}", episode.name), episode.uuid.clone()),
                Err(error) => report.fail(
                    format!("cleanup.{}", episode.name),
                    format!("{}: {error}", error.reason_code()),
                ),
            }
        }
    }
    report
}

/// Writes a validation episode straight to the graph, reads it back and removes it.
pub fn data_accessibility<G: CypherExecutor>(
    graph: &G,
    group_id: &str,
    now_ms: i64,
) -> ScenarioReport {
    let mut report = ScenarioReport::new(SCENARIO_DATA_ACCESSIBILITY);
    match graph_stats(graph, group_id) {
        Ok(stats) => report.pass("graph.stats", stats_detail(&stats)),
        Err(error) => {
            report.fail("graph.stats", format!("graph_query_failed: {error}"));
            return report;
        }
    }
    match entities(graph, group_id, SAMPLE_LIMIT) {
        Ok(found) if found.is_empty() => report.warn("graph.entities", "no entities in group"),
        Ok(found) => report.pass(
            "graph.entities",
            found
                .iter()
                .map(|entity| entity.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Err(error) => report.fail("graph.entities", format!("graph_query_failed: {error}")),
    }
    match facts(graph, group_id, SAMPLE_LIMIT) {
        Ok(found) if found.is_empty() => report.warn("graph.facts", "no facts in group"),
        Ok(found) => report.pass("graph.facts", format!("{} facts", found.len())),
        Err(error) => report.fail("graph.facts", format!("graph_query_failed: {error}")),
    }

    let draft = EpisodeDraft {
        uuid: uuid::Uuid::new_v4().to_string(),
        name: "data_accessibility_validation".to_string(),
        content: "Validation episode written by graphprobe to confirm graph reads and writes."
            .to_string(),
        source: "validation".to_string(),
        source_description: "graphprobe data accessibility check".to_string(),
        group_id: group_id.to_string(),
        created_at: now_ms,
    };
    let uuid = match create_episode(graph, &draft) {
        Ok(uuid) => {
            report.pass("episode.create", uuid.clone());
            uuid
        }
        Err(error) => {
            report.fail("episode.create", format!("graph_write_failed: {error}"));
            return report;
        }
    };
    match episode_by_uuid(graph, &uuid) {
        Ok(Some(episode)) if episode.content == draft.content => {
            report.pass("episode.read", episode.name)
        }
        Ok(Some(_)) => report.fail("episode.read", "content differs from the written episode"),
        Ok(None) => report.fail("episode.read", "episode not found after create"),
        Err(error) => report.fail("episode.read", format!("graph_query_failed: {error}")),
    }
    match delete_episode(graph, &uuid) {
        Ok(1) => report.pass("episode.delete", "1 deleted"),
        Ok(count) => report.fail("episode.delete", format!("{count} deleted")),
        Err(error) => report.fail("episode.delete", format!("graph_write_failed: {error}")),
    }
    report
}

/// Seeds the sample dataset and checks the group grew by exactly its size.
pub fn seed_sample<G: CypherExecutor>(graph: &G, group_id: &str, now_ms: i64) -> ScenarioReport {
    let mut report = ScenarioReport::new(SCENARIO_SEED_SAMPLE);
    let dataset = SampleDataset::standard(group_id, now_ms);
    let before = match graph_stats(graph, group_id) {
        Ok(stats) => stats,
        Err(error) => {
            report.fail("graph.stats.before", format!("graph_query_failed: {error}"));
            return report;
        }
    };
    report.pass("graph.stats.before", stats_detail(&before));
    match seed(graph, &dataset) {
        Ok(summary) => report.pass(
            "seed",
            format!(
                "episodes={} entities={} facts={}",
                summary.episodes, summary.entities, summary.facts
            ),
        ),
        Err(error) => {
            report.fail("seed", format!("graph_write_failed: {error}"));
            return report;
        }
    }
    match graph_stats(graph, group_id) {
        Ok(after) => {
            let grown = (
                after.episodes - before.episodes,
                after.entities - before.entities,
                after.relationships - before.relationships,
            );
            let expected = (
                dataset.episodes.len() as i64,
                dataset.entities.len() as i64,
                dataset.facts.len() as i64,
            );
            if grown == expected {
                report.pass("graph.stats.after", stats_detail(&after));
            } else {
                report.fail(
                    "graph.stats.after",
                    format!(
                        "grew by episodes={} entities={} relationships={}, expected {}/{}/{}",
                        grown.0, grown.1, grown.2, expected.0, expected.1, expected.2
                    ),
                );
            }
        }
        Err(error) => report.fail("graph.stats.after", format!("graph_query_failed: {error}")),
    }
    match entities(graph, group_id, dataset.entities.len().max(SAMPLE_LIMIT)) {
        Ok(found) => report.pass(
            "graph.entities",
            found
                .iter()
                .map(|entity| format!("{}({})", entity.name, entity.connections))
                .collect::<Vec<_>>()
                .join(","),
        ),
        Err(error) => report.fail("graph.entities", format!("graph_query_failed: {error}")),
    }
    report
}

/// Read-only listing of stored memories; fails only when a query fails.
pub fn verify_memories<G: CypherExecutor>(
    graph: &G,
    group_id: &str,
    sources: &[String],
    limit: usize,
) -> ScenarioReport {
    let mut report = ScenarioReport::new(SCENARIO_VERIFY_MEMORIES);
    match episodes_by_source(graph, group_id) {
        Ok(counts) => {
            let total: i64 = counts.iter().map(|count| count.count).sum();
            let detail = counts
                .iter()
                .map(|count| format!("{}={}", count.source, count.count))
                .collect::<Vec<_>>()
                .join(",");
            report.pass("episodes.by_source", format!("total={total} {detail}"));
        }
        Err(error) => report.fail("episodes.by_source", format!("graph_query_failed: {error}")),
    }
    if !sources.is_empty() {
        match episodes_with_sources(graph, group_id, sources) {
            Ok(found) if found.is_empty() => {
                report.warn("episodes.sources", format!("none for {}", sources.join(",")))
            }
            Ok(found) => {
                for episode in found.iter().take(limit) {
                    report.pass(
                        format!("episode.{}", episode.name),
                        preview(&episode.content, DETAIL_PREVIEW_CHARS),
                    );
                }
            }
            Err(error) => report.fail("episodes.sources", format!("graph_query_failed: {error}")),
        }
    }
    match entities(graph, group_id, limit) {
        Ok(found) => report.pass("graph.entities", format!("{} entities", found.len())),
        Err(error) => report.fail("graph.entities", format!("graph_query_failed: {error}")),
    }
    match facts(graph, group_id, limit) {
        Ok(found) => report.pass(
            "graph.facts",
            found
                .iter()
                .map(|fact| format!("{}-{}->{}", fact.source_name, fact.relation, fact.target_name))
                .collect::<Vec<_>>()
                .join(","),
        ),
        Err(error) => report.fail("graph.facts", format!("graph_query_failed: {error}")),
    }
    report
}
