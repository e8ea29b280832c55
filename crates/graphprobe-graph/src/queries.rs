//! Knowledge-graph reads and writes scoped by group id.
//!
//! Labels follow the memory server's schema: `Episodic` nodes for raw
//! episodes, `Entity` nodes for extracted entities and `RELATES_TO` edges for
//! facts. Timestamps are stored as `DateTime` values, the way the memory server
//! writes them; drafts carry epoch milliseconds and convert on write.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::cypher::{
    value_datetime, value_i64, value_str, CypherExecutor, CypherStatement, GraphError,
};

pub const EPISODE_LABEL: &str = "Episodic";
pub const ENTITY_LABEL: &str = "Entity";
pub const FACT_RELATIONSHIP: &str = "RELATES_TO";
pub const HEALTH_PROBE_LABEL: &str = "HealthProbe";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub total_nodes: i64,
    pub episodes: i64,
    pub entities: i64,
    pub relationships: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeRecord {
    pub uuid: String,
    pub name: String,
    pub content: String,
    pub source: String,
    /// `None` when the node has no timestamp or it is not a temporal value.
    pub created_at: Option<DateTime<Utc>>,
}

impl EpisodeRecord {
    pub fn created_at_label(&self) -> String {
        self.created_at
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRecord {
    pub uuid: String,
    pub name: String,
    pub summary: String,
    pub connections: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactRecord {
    pub source_name: String,
    pub relation: String,
    pub target_name: String,
    pub fact: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Episode written directly to the graph, bypassing the memory server.
pub struct EpisodeDraft {
    pub uuid: String,
    pub name: String,
    pub content: String,
    pub source: String,
    pub source_description: String,
    pub group_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteProbe {
    pub created: bool,
    pub deleted: bool,
}

const EPISODE_COLUMNS: &str = "e.uuid AS uuid, coalesce(e.name, '') AS name, \
     coalesce(e.content, '') AS content, coalesce(e.source, '') AS source, \
     e.created_at AS created_at";

fn episode_records(
    executor: &impl CypherExecutor,
    statement: CypherStatement,
) -> Result<Vec<EpisodeRecord>, GraphError> {
    let result = executor.execute_one(statement)?;
    Ok(result
        .records()
        .iter()
        .map(|record| EpisodeRecord {
            uuid: value_str(record, "uuid"),
            name: value_str(record, "name"),
            content: value_str(record, "content"),
            source: value_str(record, "source"),
            created_at: value_datetime(record, "created_at"),
        })
        .collect())
}

pub fn ping(executor: &impl CypherExecutor) -> Result<(), GraphError> {
    let result = executor.execute_one(CypherStatement::new("RETURN 1 AS test"))?;
    match result.single_i64("test")? {
        1 => Ok(()),
        other => Err(GraphError::InvalidResponse(format!(
            "connectivity query returned {other}"
        ))),
    }
}

pub fn graph_stats(
    executor: &impl CypherExecutor,
    group_id: &str,
) -> Result<GraphStats, GraphError> {
    let statements = [
        CypherStatement::new("MATCH (n) WHERE n.group_id = $group_id RETURN count(n) AS total"),
        CypherStatement::new(
            "MATCH (e:Episodic) WHERE e.group_id = $group_id RETURN count(e) AS total",
        ),
        CypherStatement::new(
            "MATCH (e:Entity) WHERE e.group_id = $group_id RETURN count(e) AS total",
        ),
        CypherStatement::new(
            "MATCH ()-[r:RELATES_TO]->() WHERE r.group_id = $group_id RETURN count(r) AS total",
        ),
    ]
    .map(|statement| statement.param("group_id", group_id));
    let results = executor.execute(&statements)?;
    let count = |index: usize| -> Result<i64, GraphError> {
        results
            .get(index)
            .ok_or_else(|| GraphError::InvalidResponse(format!("missing stats result {index}")))?
            .single_i64("total")
    };
    Ok(GraphStats {
        total_nodes: count(0)?,
        episodes: count(1)?,
        entities: count(2)?,
        relationships: count(3)?,
    })
}

pub fn episodes_by_source(
    executor: &impl CypherExecutor,
    group_id: &str,
) -> Result<Vec<SourceCount>, GraphError> {
    let result = executor.execute_one(
        CypherStatement::new(
            "MATCH (e:Episodic) WHERE e.group_id = $group_id \
             RETURN coalesce(e.source, 'unknown') AS source, count(e) AS total \
             ORDER BY total DESC, source",
        )
        .param("group_id", group_id),
    )?;
    Ok(result
        .records()
        .iter()
        .map(|record| SourceCount {
            source: value_str(record, "source"),
            count: value_i64(record, "total"),
        })
        .collect())
}

pub fn recent_episodes(
    executor: &impl CypherExecutor,
    group_id: &str,
    limit: usize,
) -> Result<Vec<EpisodeRecord>, GraphError> {
    episode_records(
        executor,
        CypherStatement::new(format!(
            "MATCH (e:Episodic) WHERE e.group_id = $group_id \
             RETURN {EPISODE_COLUMNS} ORDER BY e.created_at DESC LIMIT $limit"
        ))
        .param("group_id", group_id)
        .param("limit", limit as u64),
    )
}

pub fn episodes_with_sources(
    executor: &impl CypherExecutor,
    group_id: &str,
    sources: &[String],
) -> Result<Vec<EpisodeRecord>, GraphError> {
    episode_records(
        executor,
        CypherStatement::new(format!(
            "MATCH (e:Episodic) WHERE e.group_id = $group_id AND e.source IN $sources \
             RETURN {EPISODE_COLUMNS} ORDER BY e.created_at DESC"
        ))
        .param("group_id", group_id)
        .param("sources", sources.to_vec()),
    )
}

pub fn episodes_named(
    executor: &impl CypherExecutor,
    group_id: &str,
    names: &[String],
) -> Result<Vec<EpisodeRecord>, GraphError> {
    episode_records(
        executor,
        CypherStatement::new(format!(
            "MATCH (e:Episodic) WHERE e.group_id = $group_id AND e.name IN $names \
             RETURN {EPISODE_COLUMNS} ORDER BY e.created_at DESC"
        ))
        .param("group_id", group_id)
        .param("names", names.to_vec()),
    )
}

pub fn episodes_containing(
    executor: &impl CypherExecutor,
    group_id: &str,
    keyword: &str,
) -> Result<Vec<EpisodeRecord>, GraphError> {
    episode_records(
        executor,
        CypherStatement::new(format!(
            "MATCH (e:Episodic) WHERE e.group_id = $group_id \
             AND toLower(coalesce(e.content, '')) CONTAINS toLower($keyword) \
             RETURN {EPISODE_COLUMNS} ORDER BY e.created_at DESC"
        ))
        .param("group_id", group_id)
        .param("keyword", keyword),
    )
}

pub fn episodes_since(
    executor: &impl CypherExecutor,
    group_id: &str,
    window_ms: u64,
) -> Result<Vec<EpisodeRecord>, GraphError> {
    episode_records(
        executor,
        CypherStatement::new(format!(
            "MATCH (e:Episodic) WHERE e.group_id = $group_id \
             AND (e.created_at >= datetime() - duration({{milliseconds: $window_ms}}) \
             OR e.created_at >= timestamp() - $window_ms) \
             RETURN {EPISODE_COLUMNS} ORDER BY e.created_at DESC"
        ))
        .param("group_id", group_id)
        .param("window_ms", window_ms),
    )
}

pub fn entities(
    executor: &impl CypherExecutor,
    group_id: &str,
    limit: usize,
) -> Result<Vec<EntityRecord>, GraphError> {
    let result = executor.execute_one(
        CypherStatement::new(
            "MATCH (e:Entity) WHERE e.group_id = $group_id \
             OPTIONAL MATCH (e)-[r:RELATES_TO]-() \
             RETURN e.uuid AS uuid, coalesce(e.name, '') AS name, \
             coalesce(e.summary, '') AS summary, count(r) AS connections \
             ORDER BY name LIMIT $limit",
        )
        .param("group_id", group_id)
        .param("limit", limit as u64),
    )?;
    Ok(result
        .records()
        .iter()
        .map(|record| EntityRecord {
            uuid: value_str(record, "uuid"),
            name: value_str(record, "name"),
            summary: value_str(record, "summary"),
            connections: value_i64(record, "connections"),
        })
        .collect())
}

pub fn facts(
    executor: &impl CypherExecutor,
    group_id: &str,
    limit: usize,
) -> Result<Vec<FactRecord>, GraphError> {
    let result = executor.execute_one(
        CypherStatement::new(
            "MATCH (a:Entity)-[r:RELATES_TO]->(b:Entity) WHERE r.group_id = $group_id \
             RETURN coalesce(a.name, '') AS source_name, coalesce(r.name, '') AS relation, \
             coalesce(b.name, '') AS target_name, coalesce(r.fact, '') AS fact \
             ORDER BY source_name, relation LIMIT $limit",
        )
        .param("group_id", group_id)
        .param("limit", limit as u64),
    )?;
    Ok(result
        .records()
        .iter()
        .map(|record| FactRecord {
            source_name: value_str(record, "source_name"),
            relation: value_str(record, "relation"),
            target_name: value_str(record, "target_name"),
            fact: value_str(record, "fact"),
        })
        .collect())
}

pub(crate) fn create_episode_statement(draft: &EpisodeDraft) -> CypherStatement {
    CypherStatement::new(
        "CREATE (e:Episodic {uuid: $uuid, name: $name, content: $content, source: $source, \
         source_description: $source_description, group_id: $group_id, \
         created_at: datetime({epochMillis: $created_at}), \
         valid_at: datetime({epochMillis: $created_at})}) RETURN e.uuid AS uuid",
    )
    .param("uuid", draft.uuid.as_str())
    .param("name", draft.name.as_str())
    .param("content", draft.content.as_str())
    .param("source", draft.source.as_str())
    .param("source_description", draft.source_description.as_str())
    .param("group_id", draft.group_id.as_str())
    .param("created_at", draft.created_at)
}

pub fn create_episode(
    executor: &impl CypherExecutor,
    draft: &EpisodeDraft,
) -> Result<String, GraphError> {
    let result = executor.execute_one(create_episode_statement(draft))?;
    result
        .column_strings("uuid")?
        .into_iter()
        .next()
        .ok_or_else(|| GraphError::InvalidResponse("episode create returned no uuid".to_string()))
}

pub fn episode_by_uuid(
    executor: &impl CypherExecutor,
    uuid: &str,
) -> Result<Option<EpisodeRecord>, GraphError> {
    let records = episode_records(
        executor,
        CypherStatement::new(format!(
            "MATCH (e:Episodic {{uuid: $uuid}}) RETURN {EPISODE_COLUMNS}"
        ))
        .param("uuid", uuid),
    )?;
    Ok(records.into_iter().next())
}

pub fn delete_episode(executor: &impl CypherExecutor, uuid: &str) -> Result<i64, GraphError> {
    let result = executor.execute_one(
        CypherStatement::new(
            "MATCH (e:Episodic {uuid: $uuid}) DETACH DELETE e RETURN count(*) AS deleted",
        )
        .param("uuid", uuid),
    )?;
    result.single_i64("deleted")
}

/// Creates, reads back and deletes a throwaway node.
pub fn write_probe(
    executor: &impl CypherExecutor,
    group_id: &str,
) -> Result<WriteProbe, GraphError> {
    let probe_id = uuid::Uuid::new_v4().to_string();
    let created = executor
        .execute_one(
            CypherStatement::new(
                "CREATE (p:HealthProbe {uuid: $uuid, group_id: $group_id, created_at: datetime()}) \
                 WITH p MATCH (found:HealthProbe {uuid: $uuid}) RETURN count(found) AS total",
            )
            .param("uuid", probe_id.as_str())
            .param("group_id", group_id),
        )?
        .single_i64("total")?;
    let deleted = executor
        .execute_one(
            CypherStatement::new(
                "MATCH (p:HealthProbe {uuid: $uuid}) DELETE p RETURN count(*) AS total",
            )
            .param("uuid", probe_id.as_str()),
        )?
        .single_i64("total")?;
    tracing::debug!(probe = %probe_id, created, deleted, "neo4j write probe");
    Ok(WriteProbe {
        created: created == 1,
        deleted: deleted == 1,
    })
}
