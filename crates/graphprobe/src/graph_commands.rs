use anyhow::{Context, Result};
use graphprobe_cli::GraphCommand;
use graphprobe_core::{now_epoch_ms, preview, single_line};
use graphprobe_graph::{
    browser_guide, entities, episodes_by_source, episodes_containing, episodes_since, facts,
    graph_stats, recent_episodes, write_probe, EpisodeRecord,
};
use graphprobe_scenarios::{data_accessibility, render_scenario_report, seed_sample};

use crate::report_output::emit;
use crate::stack_runtime::StackRuntime;

const CONTENT_PREVIEW_CHARS: usize = 80;

fn render_episodes(label: &str, episodes: &[EpisodeRecord]) -> String {
    let mut lines = vec![format!("graph {label}: count={}", episodes.len())];
    lines.extend(episodes.iter().map(|episode| {
        format!(
            "graph episode: name={} source={} created_at={} content={}",
            episode.name,
            episode.source,
            episode.created_at_label(),
            preview(&single_line(&episode.content), CONTENT_PREVIEW_CHARS)
        )
    }));
    lines.join("\n")
}

pub(crate) fn execute(runtime: &StackRuntime, command: GraphCommand) -> Result<i32> {
    let graph = &runtime.graph;
    let group_id = runtime.config.group_id.as_str();
    match command {
        GraphCommand::Stats => {
            let stats = graph_stats(graph, group_id).context("failed to read graph stats")?;
            emit(
                &format!(
                    "graph stats: group_id={group_id} total_nodes={} episodes={} entities={} \
                     relationships={}",
                    stats.total_nodes, stats.episodes, stats.entities, stats.relationships
                ),
                None,
            )?;
        }
        GraphCommand::Sources => {
            let counts = episodes_by_source(graph, group_id)
                .context("failed to count episode sources")?;
            let mut lines = vec![format!(
                "graph sources: group_id={group_id} count={}",
                counts.len()
            )];
            lines.extend(counts.iter().map(|count| {
                format!(
                    "graph source: source={} episodes={}",
                    count.source, count.count
                )
            }));
            emit(&lines.join("\n"), None)?;
        }
        GraphCommand::Entities { limit } => {
            let records = entities(graph, group_id, limit).context("failed to list entities")?;
            let mut lines = vec![format!(
                "graph entities: group_id={group_id} count={}",
                records.len()
            )];
            lines.extend(records.iter().map(|entity| {
                format!(
                    "graph entity: name={} connections={} summary={}",
                    entity.name,
                    entity.connections,
                    preview(&single_line(&entity.summary), CONTENT_PREVIEW_CHARS)
                )
            }));
            emit(&lines.join("\n"), None)?;
        }
        GraphCommand::Facts { limit } => {
            let records = facts(graph, group_id, limit).context("failed to list facts")?;
            let mut lines = vec![format!(
                "graph facts: group_id={group_id} count={}",
                records.len()
            )];
            lines.extend(records.iter().map(|fact| {
                format!(
                    "graph fact: source={} relation={} target={} fact={}",
                    fact.source_name,
                    fact.relation,
                    fact.target_name,
                    preview(&single_line(&fact.fact), CONTENT_PREVIEW_CHARS)
                )
            }));
            emit(&lines.join("\n"), None)?;
        }
        GraphCommand::Recent { limit, within_ms } => {
            let episodes = match within_ms {
                Some(window_ms) => {
                    let mut episodes = episodes_since(graph, group_id, window_ms)
                        .context("failed to list recent episodes")?;
                    episodes.truncate(limit);
                    episodes
                }
                None => recent_episodes(graph, group_id, limit)
                    .context("failed to list recent episodes")?,
            };
            emit(&render_episodes("recent", &episodes), None)?;
        }
        GraphCommand::Search { keyword } => {
            let episodes = episodes_containing(graph, group_id, &keyword)
                .with_context(|| format!("failed to search episodes for '{keyword}'"))?;
            emit(&render_episodes("search", &episodes), None)?;
        }
        GraphCommand::Seed => {
            let report = seed_sample(graph, group_id, now_epoch_ms());
            emit(&render_scenario_report(&report), None)?;
            return Ok(if report.passed { 0 } else { 1 });
        }
        GraphCommand::Validate => {
            let report = data_accessibility(graph, group_id, now_epoch_ms());
            emit(&render_scenario_report(&report), None)?;
            return Ok(if report.passed { 0 } else { 1 });
        }
        GraphCommand::ProbeWrite => {
            let probe = write_probe(graph, group_id).context("graph write probe failed")?;
            emit(
                &format!(
                    "graph write_probe: created={} deleted={}",
                    probe.created, probe.deleted
                ),
                None,
            )?;
            return Ok(if probe.created && probe.deleted { 0 } else { 1 });
        }
        GraphCommand::Guide => {
            let lines = browser_guide(group_id)
                .into_iter()
                .map(|(title, query)| format!("// {title}\n{query};"))
                .collect::<Vec<_>>();
            emit(&lines.join("\n\n"), None)?;
        }
    }
    Ok(0)
}
