use anyhow::{Context, Result};
use graphprobe_cli::StackConfig;
use graphprobe_diagnostics::StackProbes;
use graphprobe_docker::{DockerCli, ProcessCommandRunner};
use graphprobe_graph::Neo4jHttpClient;
use graphprobe_llm::OllamaClient;
use graphprobe_mcp::{probe_sse_endpoint, DynMcpClient};

/// Live clients for every service, built once from the resolved config.
pub(crate) struct StackRuntime {
    pub(crate) config: StackConfig,
    pub(crate) docker: DockerCli<ProcessCommandRunner>,
    pub(crate) ollama: OllamaClient,
    pub(crate) graph: Neo4jHttpClient,
}

impl StackRuntime {
    pub(crate) fn new(config: StackConfig) -> Result<Self> {
        let docker = DockerCli::new(
            ProcessCommandRunner,
            &config.docker_bin,
            &config.container,
            config.command_timeout,
        );
        let ollama = OllamaClient::new(&config.ollama_url, config.http_timeout)?;
        let graph = Neo4jHttpClient::new(&config.neo4j_http_config())?;
        Ok(Self {
            config,
            docker,
            ollama,
            graph,
        })
    }

    pub(crate) fn probes(&self) -> StackProbes<'_, ProcessCommandRunner, Neo4jHttpClient> {
        StackProbes {
            docker: &self.docker,
            ollama: &self.ollama,
            graph: &self.graph,
            sse_probe: &probe_sse_endpoint,
        }
    }

    /// Connects to the memory server and completes the handshake.
    pub(crate) fn mcp_client(&self) -> Result<DynMcpClient> {
        let endpoint = self.config.mcp_endpoint()?;
        endpoint
            .connect_initialized(self.config.command_timeout)
            .with_context(|| format!("failed to reach mcp server at {endpoint}"))
    }
}
