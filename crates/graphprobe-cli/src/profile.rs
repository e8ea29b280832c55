use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Stack settings read from a TOML profile. Every field is optional.
///
/// ```toml
/// container = "mcp_server-graphiti-mcp-1"
/// group_id = "default"
///
/// [neo4j]
/// uri = "neo4j://192.168.1.10:7687"
/// user = "neo4j"
///
/// [mcp]
/// transport = "sse"
/// sse_url = "http://192.168.1.10:8000/sse"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackProfile {
    pub container: Option<String>,
    pub docker_bin: Option<String>,
    pub group_id: Option<String>,
    #[serde(default)]
    pub neo4j: Neo4jProfile,
    #[serde(default)]
    pub ollama: OllamaProfile,
    #[serde(default)]
    pub mcp: McpProfile,
    #[serde(default)]
    pub timeouts: TimeoutProfile,
    #[serde(default)]
    pub expectations: ExpectationProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Neo4jProfile {
    pub uri: Option<String>,
    pub http_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaProfile {
    pub url: Option<String>,
    pub llm_model: Option<String>,
    pub embedder_model: Option<String>,
    pub embedding_dim: Option<usize>,
    pub openai_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpProfile {
    /// One of `stdio`, `sse`, `http`.
    pub transport: Option<String>,
    pub sse_url: Option<String>,
    pub http_url: Option<String>,
    pub stdio_command: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutProfile {
    pub command_ms: Option<u64>,
    pub http_ms: Option<u64>,
    pub poll_attempts: Option<u32>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationProfile {
    pub required_files: Option<Vec<String>>,
    pub required_modules: Option<Vec<String>>,
}

pub fn parse_profile(raw: &str) -> Result<StackProfile> {
    toml::from_str(raw).context("failed to parse stack profile")
}

pub fn load_profile(path: &Path) -> Result<StackProfile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read stack profile {}", path.display()))?;
    parse_profile(&raw).with_context(|| format!("invalid stack profile {}", path.display()))
}
