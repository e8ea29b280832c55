use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{blocking::Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cypher::{CypherExecutor, CypherStatement, GraphError, QueryResult};

pub const DEFAULT_NEO4J_HTTP_PORT: u16 = 7474;
pub const DEFAULT_NEO4J_DATABASE: &str = "neo4j";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Connection settings for the transactional HTTP endpoint.
pub struct Neo4jHttpConfig {
    pub http_url: String,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TxCommitResponse {
    #[serde(default)]
    results: Vec<TxStatementResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxStatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
/// Blocking client for `POST /db/{database}/tx/commit`.
pub struct Neo4jHttpClient {
    client: Client,
    commit_url: String,
    user: String,
    password: Option<String>,
}

impl Neo4jHttpClient {
    pub fn new(config: &Neo4jHttpConfig) -> Result<Self> {
        let base = config.http_url.trim_end_matches('/');
        if base.is_empty() {
            bail!("neo4j http url cannot be empty");
        }
        Url::parse(base).with_context(|| format!("invalid neo4j http url '{base}'"))?;
        if config.database.trim().is_empty() {
            bail!("neo4j database name cannot be empty");
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build neo4j http client")?;
        Ok(Self {
            client,
            commit_url: format!("{base}/db/{}/tx/commit", config.database.trim()),
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    pub fn commit_url(&self) -> &str {
        &self.commit_url
    }

    /// Connectivity check: `RETURN 1 AS test` must come back as 1.
    pub fn ping(&self) -> Result<(), GraphError> {
        crate::queries::ping(self)
    }
}

impl CypherExecutor for Neo4jHttpClient {
    fn execute(&self, statements: &[CypherStatement]) -> Result<Vec<QueryResult>, GraphError> {
        let body = json!({ "statements": statements });
        tracing::debug!(
            url = %self.commit_url,
            statements = statements.len(),
            "neo4j transaction commit"
        );
        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, self.password.as_deref())
            .header("accept", "application/json")
            .json(&body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable response body>".to_string());
            return Err(GraphError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        let payload = response.json::<TxCommitResponse>()?;
        decode_commit_response(payload, statements.len())
    }
}

fn decode_commit_response(
    payload: TxCommitResponse,
    expected: usize,
) -> Result<Vec<QueryResult>, GraphError> {
    if let Some(error) = payload.errors.into_iter().next() {
        return Err(GraphError::Cypher {
            code: error.code,
            message: error.message,
        });
    }
    if payload.results.len() != expected {
        return Err(GraphError::InvalidResponse(format!(
            "expected {expected} statement results, got {}",
            payload.results.len()
        )));
    }
    Ok(payload
        .results
        .into_iter()
        .map(|result| QueryResult {
            columns: result.columns,
            rows: result.data.into_iter().map(|row| row.row).collect(),
        })
        .collect())
}

/// Decodes a raw commit response body; exposed for fuzzing the decoder.
pub fn decode_commit_body(body: &str, expected: usize) -> Result<Vec<QueryResult>, GraphError> {
    let payload = serde_json::from_str::<TxCommitResponse>(body)
        .map_err(|error| GraphError::InvalidResponse(error.to_string()))?;
    decode_commit_response(payload, expected)
}

/// Maps a bolt-style connection URI to the HTTP endpoint on port 7474.
pub fn derive_http_url(bolt_uri: &str) -> Result<String> {
    let trimmed = bolt_uri.trim();
    let url = Url::parse(trimmed).with_context(|| format!("invalid neo4j uri '{trimmed}'"))?;
    let scheme = match url.scheme() {
        "http" | "https" => return Ok(trimmed.trim_end_matches('/').to_string()),
        "neo4j" | "bolt" => "http",
        "neo4j+s" | "neo4j+ssc" | "bolt+s" | "bolt+ssc" => "https",
        other => bail!("unsupported neo4j uri scheme '{other}'"),
    };
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .with_context(|| format!("neo4j uri '{trimmed}' has no host"))?;
    Ok(format!("{scheme}://{host}:{DEFAULT_NEO4J_HTTP_PORT}"))
}
