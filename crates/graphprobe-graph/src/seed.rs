use serde::Serialize;
use uuid::Uuid;

use crate::cypher::{CypherExecutor, CypherStatement, GraphError};
use crate::queries::{create_episode_statement, EpisodeDraft};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntity {
    pub uuid: String,
    pub name: String,
    pub summary: String,
    pub entity_type: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A `RELATES_TO` edge between two entities, referenced by entity name.
pub struct SampleFact {
    pub uuid: String,
    pub source: String,
    pub target: String,
    pub relation: String,
    pub fact: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDataset {
    pub group_id: String,
    pub episodes: Vec<EpisodeDraft>,
    pub entities: Vec<SampleEntity>,
    pub facts: Vec<SampleFact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub episodes: usize,
    pub entities: usize,
    pub facts: usize,
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

fn episode(
    group_id: &str,
    name: &str,
    content: &str,
    source: &str,
    description: &str,
    at: i64,
) -> EpisodeDraft {
    EpisodeDraft {
        uuid: fresh_id(),
        name: name.to_string(),
        content: content.to_string(),
        source: source.to_string(),
        source_description: description.to_string(),
        group_id: group_id.to_string(),
        created_at: at,
    }
}

fn entity(name: &str, summary: &str, entity_type: &str, at: i64) -> SampleEntity {
    SampleEntity {
        uuid: fresh_id(),
        name: name.to_string(),
        summary: summary.to_string(),
        entity_type: entity_type.to_string(),
        created_at: at,
    }
}

fn fact(source: &str, relation: &str, target: &str, text: &str, at: i64) -> SampleFact {
    SampleFact {
        uuid: fresh_id(),
        source: source.to_string(),
        target: target.to_string(),
        relation: relation.to_string(),
        fact: text.to_string(),
        created_at: at,
    }
}

impl SampleDataset {
    /// Two people, their employer and a shared project.
    pub fn standard(group_id: &str, now_ms: i64) -> Self {
        let episodes = vec![
            episode(
                group_id,
                "Employee Profile: Alice Johnson",
                "Alice Johnson is a senior software engineer at TechCorp. She has 8 years of experience in Python development and specializes in machine learning applications.",
                "employee_profile",
                "Employee profile data",
                now_ms,
            ),
            episode(
                group_id,
                "New Hire: Bob Wilson",
                "Bob Wilson joined the AI research team last month. He has a PhD in Computer Science from MIT and previously worked at Google DeepMind.",
                "new_hire_info",
                "New hire information",
                now_ms + 1_000,
            ),
            episode(
                group_id,
                "Project Meeting: Phoenix",
                "Alice and Bob are collaborating on Project Phoenix, a new conversational AI system. The project deadline is Q2 2024.",
                "project_meeting",
                "Project meeting notes",
                now_ms + 2_000,
            ),
        ];
        let entities = vec![
            entity(
                "Alice Johnson",
                "Senior software engineer at TechCorp with 8 years of Python experience, specializing in machine learning applications.",
                "Person",
                now_ms,
            ),
            entity(
                "Bob Wilson",
                "AI researcher with PhD from MIT, previously at Google DeepMind, joined TechCorp AI research team.",
                "Person",
                now_ms + 1_000,
            ),
            entity(
                "TechCorp",
                "Technology company with Engineering, Research, and Product departments.",
                "Organization",
                now_ms,
            ),
            entity(
                "Project Phoenix",
                "Conversational AI system project with Q2 2024 deadline.",
                "Project",
                now_ms + 2_000,
            ),
        ];
        let facts = vec![
            fact(
                "Alice Johnson",
                "works_at",
                "TechCorp",
                "Alice Johnson works at TechCorp as a senior software engineer",
                now_ms,
            ),
            fact(
                "Bob Wilson",
                "works_at",
                "TechCorp",
                "Bob Wilson works at TechCorp in the AI research team",
                now_ms + 1_000,
            ),
            fact(
                "Alice Johnson",
                "works_on",
                "Project Phoenix",
                "Alice Johnson is collaborating on Project Phoenix",
                now_ms + 2_000,
            ),
            fact(
                "Bob Wilson",
                "works_on",
                "Project Phoenix",
                "Bob Wilson is collaborating on Project Phoenix",
                now_ms + 2_000,
            ),
            fact(
                "Alice Johnson",
                "collaborates_with",
                "Bob Wilson",
                "Alice Johnson collaborates with Bob Wilson on Project Phoenix",
                now_ms + 2_000,
            ),
        ];
        Self {
            group_id: group_id.to_string(),
            episodes,
            entities,
            facts,
        }
    }

    pub fn node_count(&self) -> usize {
        self.episodes.len() + self.entities.len()
    }

    fn entity_uuid(&self, name: &str) -> Result<&str, GraphError> {
        self.entities
            .iter()
            .find(|entity| entity.name == name)
            .map(|entity| entity.uuid.as_str())
            .ok_or_else(|| {
                GraphError::InvalidResponse(format!(
                    "sample fact references unknown entity '{name}'"
                ))
            })
    }

    /// Statements in creation order: episodes, entities, then facts.
    pub fn statements(&self) -> Result<Vec<CypherStatement>, GraphError> {
        let mut statements = self
            .episodes
            .iter()
            .map(create_episode_statement)
            .collect::<Vec<_>>();
        for entity in &self.entities {
            statements.push(
                CypherStatement::new(
                    "CREATE (n:Entity {uuid: $uuid, name: $name, summary: $summary, \
                     entity_type: $entity_type, created_at: datetime({epochMillis: $created_at}), \
                     group_id: $group_id})",
                )
                .param("uuid", entity.uuid.as_str())
                .param("name", entity.name.as_str())
                .param("summary", entity.summary.as_str())
                .param("entity_type", entity.entity_type.as_str())
                .param("created_at", entity.created_at)
                .param("group_id", self.group_id.as_str()),
            );
        }
        for fact in &self.facts {
            statements.push(
                CypherStatement::new(
                    "MATCH (a:Entity {uuid: $source_uuid, group_id: $group_id}), \
                     (b:Entity {uuid: $target_uuid, group_id: $group_id}) \
                     CREATE (a)-[:RELATES_TO {uuid: $uuid, name: $name, fact: $fact, \
                     created_at: datetime({epochMillis: $created_at}), \
                     valid_at: datetime({epochMillis: $created_at}), group_id: $group_id}]->(b)",
                )
                .param("source_uuid", self.entity_uuid(&fact.source)?)
                .param("target_uuid", self.entity_uuid(&fact.target)?)
                .param("uuid", fact.uuid.as_str())
                .param("name", fact.relation.as_str())
                .param("fact", fact.fact.as_str())
                .param("created_at", fact.created_at)
                .param("group_id", self.group_id.as_str()),
            );
        }
        Ok(statements)
    }
}

/// Writes the dataset in a single transaction.
pub fn seed(
    executor: &impl CypherExecutor,
    dataset: &SampleDataset,
) -> Result<SeedSummary, GraphError> {
    let statements = dataset.statements()?;
    executor.execute(&statements)?;
    tracing::info!(
        group_id = %dataset.group_id,
        episodes = dataset.episodes.len(),
        entities = dataset.entities.len(),
        facts = dataset.facts.len(),
        "sample dataset seeded"
    );
    Ok(SeedSummary {
        episodes: dataset.episodes.len(),
        entities: dataset.entities.len(),
        facts: dataset.facts.len(),
    })
}
