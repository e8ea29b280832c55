use std::time::Duration;

use anyhow::Result;
use graphprobe_docker::DockerCli;
use graphprobe_llm::OllamaClient;
use graphprobe_mcp::SseProbe;

/// Signature of the SSE endpoint probe; injected so tests can fake it.
pub type SseProbeFn<'a> = &'a dyn Fn(&str, Duration) -> Result<SseProbe>;

/// Handles on every service of the stack, shared by all reports.
pub struct StackProbes<'a, R, G> {
    pub docker: &'a DockerCli<R>,
    pub ollama: &'a OllamaClient,
    pub graph: &'a G,
    pub sse_probe: SseProbeFn<'a>,
}

impl<R, G> Clone for StackProbes<'_, R, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, G> Copy for StackProbes<'_, R, G> {}
