use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::runner::{render_command_line, CommandOutput, CommandRunner};

pub const DEFAULT_CONTAINER_NAME: &str = "mcp_server-graphiti-mcp-1";
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

const PS_FORMAT: &str = "{{.Names}}\t{{.Status}}\t{{.Ports}}";
const STATS_FORMAT: &str = "{{.CPUPerc}}\t{{.MemUsage}}";
const NETWORKS_FORMAT: &str = "{{json .NetworkSettings.Networks}}";

#[derive(Debug, Clone, PartialEq, Eq)]
/// One `docker ps` row for the target container.
pub struct ContainerStatus {
    pub name: String,
    pub status: String,
    pub ports: String,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUsage {
    pub cpu_percent: String,
    pub memory: String,
}

#[derive(Debug, Clone)]
/// Thin wrapper over the `docker` CLI scoped to one container.
pub struct DockerCli<R> {
    runner: R,
    binary: String,
    container: String,
    timeout: Duration,
}

impl<R: CommandRunner> DockerCli<R> {
    pub fn new(runner: R, binary: &str, container: &str, timeout: Duration) -> Self {
        Self {
            runner,
            binary: binary.to_string(),
            container: container.to_string(),
            timeout,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    fn docker(&self, args: &[&str]) -> Result<CommandOutput> {
        let args = args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>();
        self.runner
            .run(&self.binary, &args, None, self.timeout)
            .with_context(|| {
                format!(
                    "failed to run docker command: {}",
                    render_command_line(&self.binary, &args)
                )
            })
    }

    /// Looks up the container by exact name; `None` when no row matches.
    pub fn container_status(&self) -> Result<Option<ContainerStatus>> {
        let filter = format!("name={}", self.container);
        let output = self.docker(&["ps", "--filter", &filter, "--format", PS_FORMAT])?;
        if !output.success() {
            bail!(
                "docker ps failed with status {}: {}",
                output.status_label(),
                output.stderr.trim()
            );
        }
        Ok(parse_ps_rows(&output.stdout)
            .into_iter()
            .find(|row| row.name == self.container))
    }

    pub fn logs_tail(&self, lines: usize) -> Result<String> {
        let lines = lines.to_string();
        let output = self.docker(&["logs", "--tail", &lines, &self.container])?;
        if !output.success() {
            bail!(
                "docker logs failed with status {}: {}",
                output.status_label(),
                output.stderr.trim()
            );
        }
        Ok(output.combined())
    }

    /// Reads one environment variable inside the container; unset reads as `None`.
    pub fn printenv(&self, variable: &str) -> Result<Option<String>> {
        let output = self.docker(&["exec", &self.container, "printenv", variable])?;
        if output.timed_out {
            bail!("docker exec printenv {variable} timed out");
        }
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(output.stdout.trim().to_string()))
    }

    /// Permission column of `ls -ld <path>` inside the container.
    pub fn file_mode(&self, path: &str) -> Result<Option<String>> {
        let output = self.docker(&["exec", &self.container, "ls", "-ld", path])?;
        if !output.success() {
            return Ok(None);
        }
        Ok(parse_ls_mode(&output.stdout))
    }

    pub fn module_importable(&self, module: &str) -> Result<bool> {
        validate_module_name(module)?;
        let statement = format!("import {module}");
        let output = self.docker(&["exec", &self.container, "python3", "-c", &statement])?;
        Ok(output.success())
    }

    pub fn networks(&self) -> Result<Vec<String>> {
        let output = self.docker(&["inspect", &self.container, "--format", NETWORKS_FORMAT])?;
        if !output.success() {
            bail!(
                "docker inspect failed with status {}: {}",
                output.status_label(),
                output.stderr.trim()
            );
        }
        parse_networks_json(&output.stdout)
    }

    pub fn port_mappings(&self) -> Result<Vec<PortMapping>> {
        let output = self.docker(&["port", &self.container])?;
        if !output.success() {
            bail!(
                "docker port failed with status {}: {}",
                output.status_label(),
                output.stderr.trim()
            );
        }
        Ok(parse_port_mappings(&output.stdout))
    }

    pub fn resource_usage(&self) -> Result<Option<ResourceUsage>> {
        let output = self.docker(&[
            "stats",
            &self.container,
            "--no-stream",
            "--format",
            STATS_FORMAT,
        ])?;
        if !output.success() {
            return Ok(None);
        }
        Ok(parse_stats_line(&output.stdout))
    }
}

pub fn parse_ps_rows(raw: &str) -> Vec<ContainerStatus> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("NAMES"))
        .map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next().unwrap_or_default().trim().to_string();
            let status = fields.next().unwrap_or_default().trim().to_string();
            let ports = fields.next().unwrap_or_default().trim().to_string();
            let running = status.starts_with("Up");
            ContainerStatus {
                name,
                status,
                ports,
                running,
            }
        })
        .collect()
}

/// Parses `docker port` lines such as `8000/tcp -> 0.0.0.0:8000`.
pub fn parse_port_mappings(raw: &str) -> Vec<PortMapping> {
    raw.lines()
        .filter_map(|line| {
            let (container_side, host) = line.split_once("->")?;
            let (port, protocol) = container_side.trim().split_once('/')?;
            Some(PortMapping {
                container_port: port.trim().parse().ok()?,
                protocol: protocol.trim().to_string(),
                host: host.trim().to_string(),
            })
        })
        .collect()
}

pub fn parse_networks_json(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let value = serde_json::from_str::<Value>(trimmed)
        .with_context(|| format!("invalid docker inspect networks payload '{trimmed}'"))?;
    let Some(object) = value.as_object() else {
        bail!("docker inspect networks payload is not an object");
    };
    let mut names = object.keys().cloned().collect::<Vec<_>>();
    names.sort();
    Ok(names)
}

pub fn parse_stats_line(raw: &str) -> Option<ResourceUsage> {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("CPU"))?;
    let (cpu, memory) = line.split_once('\t')?;
    Some(ResourceUsage {
        cpu_percent: cpu.trim().to_string(),
        memory: memory.trim().to_string(),
    })
}

pub fn parse_ls_mode(raw: &str) -> Option<String> {
    raw.split_whitespace().next().map(ToString::to_string)
}

/// Accepts dotted Python identifiers only, so the value is safe inside `-c`.
pub fn validate_module_name(module: &str) -> Result<()> {
    let valid = !module.is_empty()
        && module.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });
    if !valid {
        bail!("invalid python module name '{module}'");
    }
    Ok(())
}
