//! Neo4j access for the knowledge-graph memory stack.
//!
//! Statements go over the transactional HTTP endpoint with every value bound
//! as a parameter. Query helpers read the memory server's schema (episodes,
//! entities, facts) scoped by group id.

pub mod client;
pub mod cypher;
pub mod guide;
pub mod queries;
pub mod scripted;
pub mod seed;

pub use client::{
    decode_commit_body, derive_http_url, Neo4jHttpClient, Neo4jHttpConfig,
    DEFAULT_NEO4J_DATABASE, DEFAULT_NEO4J_HTTP_PORT,
};
pub use cypher::{CypherExecutor, CypherStatement, GraphError, QueryResult};
pub use guide::browser_guide;
pub use queries::{
    create_episode, delete_episode, entities, episode_by_uuid, episodes_by_source,
    episodes_containing, episodes_named, episodes_since, episodes_with_sources, facts,
    graph_stats, ping, recent_episodes, write_probe, EntityRecord, EpisodeDraft, EpisodeRecord,
    FactRecord, GraphStats, SourceCount, WriteProbe, ENTITY_LABEL, EPISODE_LABEL,
    FACT_RELATIONSHIP, HEALTH_PROBE_LABEL,
};
pub use scripted::ScriptedCypherExecutor;
pub use seed::{seed, SampleDataset, SampleEntity, SampleFact, SeedSummary};
