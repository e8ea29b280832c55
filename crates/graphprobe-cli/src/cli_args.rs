use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::{CliSuite, CliTransport};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "graphprobe",
    about = "Diagnostics and validation for a knowledge-graph memory stack (MCP server, Neo4j, Ollama)",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub stack: StackArgs,

    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = ArgAction::Count,
        help = "Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides"
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Writes the completion script for `shell`, named after the binary.
    pub fn write_completions(shell: Shell, writer: &mut dyn Write) -> io::Result<()> {
        let mut command = Self::command();
        let bin_name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, bin_name, writer);
        writer.flush()
    }
}

/// Stack connection flags. Unset flags fall back to the profile, then defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct StackArgs {
    #[arg(
        long,
        global = true,
        env = "GRAPHPROBE_CONFIG",
        help = "TOML profile providing stack settings"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "GRAPHPROBE_CONTAINER",
        help = "Name of the MCP server container"
    )]
    pub container: Option<String>,

    #[arg(
        long = "docker-bin",
        global = true,
        env = "GRAPHPROBE_DOCKER_BIN",
        help = "docker executable"
    )]
    pub docker_bin: Option<String>,

    #[arg(
        long = "neo4j-uri",
        global = true,
        env = "NEO4J_URI",
        help = "Bolt URI of the graph database"
    )]
    pub neo4j_uri: Option<String>,

    #[arg(
        long = "neo4j-http-url",
        global = true,
        env = "GRAPHPROBE_NEO4J_HTTP_URL",
        help = "HTTP endpoint of the graph database; derived from --neo4j-uri when unset"
    )]
    pub neo4j_http_url: Option<String>,

    #[arg(long = "neo4j-user", global = true, env = "NEO4J_USER")]
    pub neo4j_user: Option<String>,

    #[arg(
        long = "neo4j-password",
        global = true,
        env = "NEO4J_PASSWORD",
        hide_env_values = true
    )]
    pub neo4j_password: Option<String>,

    #[arg(long = "neo4j-database", global = true, env = "GRAPHPROBE_NEO4J_DATABASE")]
    pub neo4j_database: Option<String>,

    #[arg(
        long = "group-id",
        global = true,
        env = "GRAPHPROBE_GROUP_ID",
        help = "Knowledge-graph partition to inspect"
    )]
    pub group_id: Option<String>,

    #[arg(long = "ollama-url", global = true, env = "GRAPHPROBE_OLLAMA_URL")]
    pub ollama_url: Option<String>,

    #[arg(long = "llm-model", global = true, env = "MODEL_NAME")]
    pub llm_model: Option<String>,

    #[arg(long = "embedder-model", global = true, env = "EMBEDDER_MODEL_NAME")]
    pub embedder_model: Option<String>,

    #[arg(
        long = "embedding-dim",
        global = true,
        env = "EMBEDDING_DIM",
        value_parser = parse_positive_usize
    )]
    pub embedding_dim: Option<usize>,

    #[arg(
        long = "openai-base-url",
        global = true,
        env = "OPENAI_BASE_URL",
        help = "OpenAI-compatible base URL the container is expected to use"
    )]
    pub openai_base_url: Option<String>,

    #[arg(long = "mcp-sse-url", global = true, env = "GRAPHPROBE_MCP_SSE_URL")]
    pub mcp_sse_url: Option<String>,

    #[arg(long = "mcp-http-url", global = true, env = "GRAPHPROBE_MCP_HTTP_URL")]
    pub mcp_http_url: Option<String>,

    #[arg(
        long = "mcp-stdio-command",
        global = true,
        env = "GRAPHPROBE_MCP_STDIO_COMMAND",
        help = "Command line spawning the MCP server on stdio"
    )]
    pub mcp_stdio_command: Option<String>,

    #[arg(long, global = true, env = "GRAPHPROBE_TRANSPORT", value_enum)]
    pub transport: Option<CliTransport>,

    #[arg(
        long = "command-timeout-ms",
        global = true,
        env = "GRAPHPROBE_COMMAND_TIMEOUT_MS",
        value_parser = parse_positive_u64
    )]
    pub command_timeout_ms: Option<u64>,

    #[arg(
        long = "http-timeout-ms",
        global = true,
        env = "GRAPHPROBE_HTTP_TIMEOUT_MS",
        value_parser = parse_positive_u64
    )]
    pub http_timeout_ms: Option<u64>,

    #[arg(
        long = "poll-attempts",
        global = true,
        env = "GRAPHPROBE_POLL_ATTEMPTS",
        value_parser = parse_positive_u32
    )]
    pub poll_attempts: Option<u32>,

    #[arg(
        long = "poll-interval-ms",
        global = true,
        env = "GRAPHPROBE_POLL_INTERVAL_MS"
    )]
    pub poll_interval_ms: Option<u64>,

    #[arg(
        long = "required-file",
        global = true,
        help = "File that must exist inside the container (repeatable)"
    )]
    pub required_files: Vec<String>,

    #[arg(
        long = "required-module",
        global = true,
        help = "Python module that must be importable inside the container (repeatable)"
    )]
    pub required_modules: Vec<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ReportArgs {
    #[arg(long, help = "Render the report as JSON")]
    pub json: bool,

    #[arg(long, help = "Also write the rendered report to this path")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check every stack component and exit 0 (healthy), 1 (degraded) or 2 (unhealthy).
    Health {
        #[command(flatten)]
        report: ReportArgs,
        #[arg(long, value_delimiter = ',', help = "Component to skip (repeatable)")]
        skip: Vec<String>,
    },
    /// Inspect the container's environment, files, modules and docker wiring.
    ConfigCheck {
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Summarize model liveness and graph statistics.
    Status {
        #[command(flatten)]
        report: ReportArgs,
    },
    #[command(subcommand)]
    Graph(GraphCommand),
    #[command(subcommand)]
    Llm(LlmCommand),
    #[command(subcommand)]
    Mcp(McpCommand),
    #[command(subcommand)]
    Memory(MemoryCommand),
    /// Run the unit, integration and validation suites.
    Suite {
        #[command(flatten)]
        report: ReportArgs,
        #[arg(long, value_enum, default_value = "all")]
        suite: CliSuite,
        #[arg(long, help = "Append full health and status reports")]
        reports: bool,
    },
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum GraphCommand {
    /// Node and relationship counts for the group.
    Stats,
    /// Episode counts by source.
    Sources,
    Entities {
        #[arg(long, default_value_t = 20, value_parser = parse_positive_usize)]
        limit: usize,
    },
    Facts {
        #[arg(long, default_value_t = 20, value_parser = parse_positive_usize)]
        limit: usize,
    },
    Recent {
        #[arg(long, default_value_t = 10, value_parser = parse_positive_usize)]
        limit: usize,
        #[arg(long = "within-ms", help = "Only episodes created within this window")]
        within_ms: Option<u64>,
    },
    /// Episodes whose content contains a keyword, case-insensitively.
    Search { keyword: String },
    /// Write the sample dataset and verify the counts grew by its size.
    Seed,
    /// Create, read back and delete a validation episode.
    Validate,
    /// Create and delete a throwaway probe node.
    ProbeWrite,
    /// Print queries for exploring the group in the database browser.
    Guide,
}

#[derive(Debug, Subcommand)]
pub enum LlmCommand {
    Models,
    Generate {
        prompt: String,
        #[arg(long, help = "Model to use instead of the configured LLM")]
        model: Option<String>,
    },
    Embed {
        text: String,
        #[arg(long, help = "Model to use instead of the configured embedder")]
        model: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum McpCommand {
    /// List the server's tools and flag missing memory tools.
    Tools,
    /// Call the server's get_status tool.
    Status,
    /// Check that the SSE endpoint answers with an event stream.
    Probe,
    Call {
        tool: String,
        #[arg(long, default_value = "{}", help = "Tool arguments as a JSON object")]
        arguments: String,
    },
    /// Delete all data in the knowledge graph.
    Clear {
        #[arg(long = "confirm-clear", help = "Required: confirm wiping the whole graph")]
        confirm_clear: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum MemoryCommand {
    /// Add one text episode through the memory server.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        body: String,
        #[arg(long = "source-description", default_value = "graphprobe")]
        source_description: String,
    },
    /// Add sample memories, wait for ingestion, then search them.
    Flow {
        #[arg(long, help = "Delete the created episodes afterwards")]
        cleanup: bool,
    },
    /// List stored memories, entities and facts.
    Verify {
        #[arg(long = "source", help = "Episode source to list (repeatable)")]
        sources: Vec<String>,
        #[arg(long, default_value_t = 10, value_parser = parse_positive_usize)]
        limit: usize,
    },
    /// Search nodes and facts through the memory server.
    Search {
        query: String,
        #[arg(long, default_value_t = 10, value_parser = parse_positive_usize)]
        limit: usize,
    },
}
