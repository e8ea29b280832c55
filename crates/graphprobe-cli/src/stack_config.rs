//! Resolution of flags, environment and profile into one `StackConfig`.
//!
//! Precedence is flag or environment variable, then the TOML profile, then
//! the built-in default.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use graphprobe_core::{mask_secret, PollPolicy};
use graphprobe_diagnostics::{
    ConfigExpectations, EnvExpectation, HealthSettings, StatusSettings, DEFAULT_LOG_TAIL_LINES,
    HEALTH_COMPONENTS,
};
use graphprobe_docker::{DEFAULT_CONTAINER_NAME, DEFAULT_DOCKER_BINARY};
use graphprobe_graph::{derive_http_url, Neo4jHttpConfig, DEFAULT_NEO4J_DATABASE};
use graphprobe_llm::{DEFAULT_EMBEDDER_MODEL, DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL};
use graphprobe_mcp::McpEndpoint;
use graphprobe_scenarios::{MemoryFlowSettings, SuiteSettings};
use reqwest::Url;

use crate::profile::{load_profile, StackProfile};
use crate::{CliTransport, StackArgs};

pub const DEFAULT_NEO4J_URI: &str = "neo4j://localhost:7687";
pub const DEFAULT_NEO4J_USER: &str = "neo4j";
pub const DEFAULT_GROUP_ID: &str = "default";
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;
pub const DEFAULT_MCP_SSE_URL: &str = "http://localhost:8000/sse";
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_REQUIRED_FILES: [&str; 3] = [
    "/app/graphiti_mcp_server.py",
    "/app/.env",
    "/app/pyproject.toml",
];
pub const DEFAULT_REQUIRED_MODULES: [&str; 6] =
    ["graphiti_core", "neo4j", "openai", "mcp", "pydantic", "dotenv"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    pub container: String,
    pub docker_bin: String,
    pub neo4j_uri: String,
    pub neo4j_http_url: String,
    pub neo4j_user: String,
    pub neo4j_password: Option<String>,
    pub neo4j_database: String,
    pub group_id: String,
    pub ollama_url: String,
    pub llm_model: String,
    pub embedder_model: String,
    pub embedding_dim: usize,
    pub openai_base_url: String,
    pub mcp_transport: CliTransport,
    pub mcp_sse_url: String,
    pub mcp_http_url: Option<String>,
    pub mcp_stdio_command: String,
    pub command_timeout: Duration,
    pub http_timeout: Duration,
    pub poll: PollPolicy,
    pub required_files: Vec<String>,
    pub required_modules: Vec<String>,
}

fn pick(flag: &Option<String>, profile: &Option<String>, default: &str) -> String {
    flag.clone()
        .or_else(|| profile.clone())
        .unwrap_or_else(|| default.to_string())
}

fn pick_list(flag: &[String], profile: &Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    if !flag.is_empty() {
        return flag.to_vec();
    }
    profile
        .clone()
        .unwrap_or_else(|| default.iter().map(ToString::to_string).collect())
}

fn default_stdio_command(container: &str) -> String {
    format!("docker exec -i {container} uv run graphiti_mcp_server.py --transport stdio")
}

fn check_url(label: &str, value: &str) -> Result<()> {
    Url::parse(value).with_context(|| format!("invalid {label} '{value}'"))?;
    Ok(())
}

impl StackConfig {
    /// Loads the profile named by `--config`, if any, and resolves.
    pub fn resolve(args: &StackArgs) -> Result<Self> {
        let profile = match &args.config {
            Some(path) => load_profile(path)?,
            None => StackProfile::default(),
        };
        Self::resolve_with_profile(args, &profile)
    }

    pub fn resolve_with_profile(args: &StackArgs, profile: &StackProfile) -> Result<Self> {
        let container = pick(&args.container, &profile.container, DEFAULT_CONTAINER_NAME);
        let neo4j_uri = pick(&args.neo4j_uri, &profile.neo4j.uri, DEFAULT_NEO4J_URI);
        let neo4j_http_url = match args
            .neo4j_http_url
            .clone()
            .or_else(|| profile.neo4j.http_url.clone())
        {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => derive_http_url(&neo4j_uri)?,
        };
        let ollama_url = pick(&args.ollama_url, &profile.ollama.url, DEFAULT_OLLAMA_URL)
            .trim_end_matches('/')
            .to_string();
        let openai_base_url = args
            .openai_base_url
            .clone()
            .or_else(|| profile.ollama.openai_base_url.clone())
            .unwrap_or_else(|| format!("{ollama_url}/v1/"));
        let mcp_transport = match (args.transport, profile.mcp.transport.as_deref()) {
            (Some(transport), _) => transport,
            (None, Some(raw)) => CliTransport::from_str(raw, true).map_err(|error| {
                anyhow::anyhow!("invalid mcp transport '{raw}' in profile: {error}")
            })?,
            (None, None) => CliTransport::Sse,
        };
        let mcp_stdio_command = args
            .mcp_stdio_command
            .clone()
            .or_else(|| profile.mcp.stdio_command.clone())
            .unwrap_or_else(|| default_stdio_command(&container));
        let timeouts = &profile.timeouts;
        let poll = PollPolicy {
            attempts: args
                .poll_attempts
                .or(timeouts.poll_attempts)
                .unwrap_or(PollPolicy::default().attempts),
            interval: args
                .poll_interval_ms
                .or(timeouts.poll_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(PollPolicy::default().interval),
        };

        let config = Self {
            docker_bin: pick(&args.docker_bin, &profile.docker_bin, DEFAULT_DOCKER_BINARY),
            neo4j_http_url,
            neo4j_user: pick(&args.neo4j_user, &profile.neo4j.user, DEFAULT_NEO4J_USER),
            neo4j_password: args
                .neo4j_password
                .clone()
                .or_else(|| profile.neo4j.password.clone()),
            neo4j_database: pick(
                &args.neo4j_database,
                &profile.neo4j.database,
                DEFAULT_NEO4J_DATABASE,
            ),
            group_id: pick(&args.group_id, &profile.group_id, DEFAULT_GROUP_ID),
            llm_model: pick(&args.llm_model, &profile.ollama.llm_model, DEFAULT_LLM_MODEL),
            embedder_model: pick(
                &args.embedder_model,
                &profile.ollama.embedder_model,
                DEFAULT_EMBEDDER_MODEL,
            ),
            embedding_dim: args
                .embedding_dim
                .or(profile.ollama.embedding_dim)
                .unwrap_or(DEFAULT_EMBEDDING_DIM),
            openai_base_url,
            mcp_transport,
            mcp_sse_url: pick(&args.mcp_sse_url, &profile.mcp.sse_url, DEFAULT_MCP_SSE_URL),
            mcp_http_url: args
                .mcp_http_url
                .clone()
                .or_else(|| profile.mcp.http_url.clone()),
            mcp_stdio_command,
            command_timeout: Duration::from_millis(
                args.command_timeout_ms
                    .or(timeouts.command_ms)
                    .unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS),
            ),
            http_timeout: Duration::from_millis(
                args.http_timeout_ms
                    .or(timeouts.http_ms)
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS),
            ),
            poll,
            required_files: pick_list(
                &args.required_files,
                &profile.expectations.required_files,
                &DEFAULT_REQUIRED_FILES,
            ),
            required_modules: pick_list(
                &args.required_modules,
                &profile.expectations.required_modules,
                &DEFAULT_REQUIRED_MODULES,
            ),
            container,
            neo4j_uri,
            ollama_url,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.container.trim().is_empty() {
            bail!("container name must not be empty");
        }
        if self.group_id.trim().is_empty() {
            bail!("group id must not be empty");
        }
        if self.embedding_dim == 0 {
            bail!("embedding dimension must be greater than 0");
        }
        if self.command_timeout.is_zero() || self.http_timeout.is_zero() {
            bail!("timeouts must be greater than 0");
        }
        if self.poll.attempts == 0 {
            bail!("poll attempts must be greater than 0");
        }
        check_url("neo4j http url", &self.neo4j_http_url)?;
        check_url("ollama url", &self.ollama_url)?;
        check_url("openai base url", &self.openai_base_url)?;
        check_url("mcp sse url", &self.mcp_sse_url)?;
        if let Some(url) = &self.mcp_http_url {
            check_url("mcp http url", url)?;
        }
        Ok(())
    }

    pub fn neo4j_http_config(&self) -> Neo4jHttpConfig {
        Neo4jHttpConfig {
            http_url: self.neo4j_http_url.clone(),
            user: self.neo4j_user.clone(),
            password: self.neo4j_password.clone(),
            database: self.neo4j_database.clone(),
            timeout: self.http_timeout,
        }
    }

    pub fn mcp_endpoint(&self) -> Result<McpEndpoint> {
        Ok(match self.mcp_transport {
            CliTransport::Stdio => McpEndpoint::Stdio {
                command: self.mcp_stdio_command.clone(),
            },
            CliTransport::Sse => McpEndpoint::Sse {
                url: self.mcp_sse_url.clone(),
            },
            CliTransport::Http => McpEndpoint::Http {
                url: self
                    .mcp_http_url
                    .clone()
                    .context("http transport requires --mcp-http-url")?,
            },
        })
    }

    /// Port the SSE endpoint listens on, expected to be published by the container.
    pub fn mcp_port(&self) -> Option<u16> {
        Url::parse(&self.mcp_sse_url)
            .ok()
            .and_then(|url| url.port_or_known_default())
    }

    pub fn health_settings(&self, skip: &[String]) -> Result<HealthSettings> {
        let mut skipped = BTreeSet::new();
        for name in skip {
            let name = name.trim();
            if !HEALTH_COMPONENTS.contains(&name) {
                bail!(
                    "unknown health component '{name}', expected one of {}",
                    HEALTH_COMPONENTS.join(",")
                );
            }
            skipped.insert(name.to_string());
        }
        Ok(HealthSettings {
            llm_model: self.llm_model.clone(),
            embedder_model: self.embedder_model.clone(),
            embedding_dim: self.embedding_dim,
            group_id: self.group_id.clone(),
            mcp_sse_url: self.mcp_sse_url.clone(),
            probe_timeout: self.http_timeout,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            skip: skipped,
        })
    }

    pub fn status_settings(&self) -> StatusSettings {
        StatusSettings {
            llm_model: self.llm_model.clone(),
            embedder_model: self.embedder_model.clone(),
            group_id: self.group_id.clone(),
        }
    }

    pub fn config_expectations(&self) -> ConfigExpectations {
        ConfigExpectations {
            env: vec![
                EnvExpectation::secret("OPENAI_API_KEY"),
                EnvExpectation::equals("OPENAI_BASE_URL", self.openai_base_url.as_str()),
                EnvExpectation::equals("MODEL_NAME", self.llm_model.as_str()),
                EnvExpectation::equals("EMBEDDER_MODEL_NAME", self.embedder_model.as_str()),
                EnvExpectation::equals("EMBEDDING_DIM", self.embedding_dim.to_string()),
                EnvExpectation::equals("NEO4J_URI", self.neo4j_uri.as_str()),
                EnvExpectation::equals("NEO4J_USER", self.neo4j_user.as_str()),
                EnvExpectation::secret("NEO4J_PASSWORD"),
            ],
            files: self.required_files.clone(),
            modules: self.required_modules.clone(),
            mcp_port: self.mcp_port(),
        }
    }

    pub fn memory_flow_settings(&self, cleanup: bool) -> MemoryFlowSettings {
        MemoryFlowSettings {
            poll: self.poll,
            cleanup,
            ..MemoryFlowSettings::new(&self.group_id)
        }
    }

    pub fn suite_settings(&self, include_reports: bool) -> Result<SuiteSettings> {
        Ok(SuiteSettings {
            health: self.health_settings(&[])?,
            status: self.status_settings(),
            expectations: self.config_expectations(),
            memory_flow: self.memory_flow_settings(true),
            include_reports,
        })
    }

    /// Settings as `key=value` pairs with the password masked.
    pub fn summary_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("container", self.container.clone()),
            ("neo4j_http_url", self.neo4j_http_url.clone()),
            ("neo4j_user", self.neo4j_user.clone()),
            (
                "neo4j_password",
                mask_secret(self.neo4j_password.as_deref().unwrap_or_default()).to_string(),
            ),
            ("group_id", self.group_id.clone()),
            ("ollama_url", self.ollama_url.clone()),
            ("llm_model", self.llm_model.clone()),
            ("embedder_model", self.embedder_model.clone()),
            ("mcp_transport", self.mcp_transport.as_str().to_string()),
        ]
    }
}
