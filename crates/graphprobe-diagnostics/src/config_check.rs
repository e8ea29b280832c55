use graphprobe_core::mask_secret;
use graphprobe_docker::CommandRunner;
use serde::Serialize;
use serde_json::json;

use crate::checks::{
    count_checks, error_code, render_component_lines, CheckResult, CheckStatus, ComponentReport,
};
use crate::probes::StackProbes;

pub const SECTION_CONTAINER: &str = "container";
pub const SECTION_ENVIRONMENT: &str = "environment";
pub const SECTION_FILES: &str = "files";
pub const SECTION_MODULES: &str = "modules";
pub const SECTION_DOCKER: &str = "docker";

#[derive(Debug, Clone, PartialEq, Eq)]
/// What one container environment variable should hold.
pub struct EnvExpectation {
    pub name: String,
    /// `None` checks presence only.
    pub expected: Option<String>,
    pub secret: bool,
}

impl EnvExpectation {
    pub fn equals(name: &str, expected: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            expected: Some(expected.into()),
            secret: false,
        }
    }

    pub fn secret(name: &str) -> Self {
        Self {
            name: name.to_string(),
            expected: None,
            secret: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigExpectations {
    pub env: Vec<EnvExpectation>,
    pub files: Vec<String>,
    pub modules: Vec<String>,
    pub mcp_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigCheckReport {
    pub components: Vec<ComponentReport>,
    pub passed: bool,
}

impl ConfigCheckReport {
    pub fn exit_code(&self) -> i32 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

fn env_check<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
    expectation: &EnvExpectation,
) -> CheckResult {
    let key = format!("{SECTION_ENVIRONMENT}.{}", expectation.name);
    let value = match probes.docker.printenv(&expectation.name) {
        Ok(Some(value)) if !value.is_empty() => value,
        Ok(_) => {
            return CheckResult::fail(key, "unset")
                .with_action(format!("set {} in the container .env", expectation.name))
        }
        Err(error) => return CheckResult::fail(key, error_code("exec_failed", &error)),
    };
    if expectation.secret {
        return CheckResult::pass(key, "present").with_target(mask_secret(&value));
    }
    match expectation.expected.as_deref() {
        Some(expected) if expected == value => CheckResult::pass(key, "matches").with_target(value),
        Some(expected) => CheckResult::warn(key, "mismatch")
            .with_target(value)
            .with_action(format!("expected {expected}")),
        None => CheckResult::pass(key, "present").with_target(value),
    }
}

fn check_environment<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
    expectations: &ConfigExpectations,
) -> ComponentReport {
    let checks = expectations
        .env
        .iter()
        .map(|expectation| env_check(probes, expectation))
        .collect();
    ComponentReport::from_checks(SECTION_ENVIRONMENT, checks)
}

fn check_files<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
    expectations: &ConfigExpectations,
) -> ComponentReport {
    let checks = expectations
        .files
        .iter()
        .map(|path| {
            let key = format!("{SECTION_FILES}.{path}");
            match probes.docker.file_mode(path) {
                Ok(Some(mode)) => CheckResult::pass(key, "present").with_target(mode),
                Ok(None) => CheckResult::fail(key, "missing"),
                Err(error) => CheckResult::fail(key, error_code("exec_failed", &error)),
            }
        })
        .collect();
    ComponentReport::from_checks(SECTION_FILES, checks)
}

fn check_modules<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
    expectations: &ConfigExpectations,
) -> ComponentReport {
    let checks = expectations
        .modules
        .iter()
        .map(|module| {
            let key = format!("{SECTION_MODULES}.{module}");
            match probes.docker.module_importable(module) {
                Ok(true) => CheckResult::pass(key, "importable"),
                Ok(false) => CheckResult::fail(key, "import_failed")
                    .with_action("rebuild the server image with its dependencies"),
                Err(error) => CheckResult::fail(key, error_code("exec_failed", &error)),
            }
        })
        .collect();
    ComponentReport::from_checks(SECTION_MODULES, checks)
}

fn check_docker_setup<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
    expectations: &ConfigExpectations,
) -> ComponentReport {
    let docker = probes.docker;
    let mut checks = vec![match docker.networks() {
        Ok(networks) if !networks.is_empty() => {
            CheckResult::pass(
                format!("{SECTION_DOCKER}.networks"),
                format!("count={}", networks.len()),
            )
            .with_target(networks.join(","))
        }
        Ok(_) => CheckResult::fail(format!("{SECTION_DOCKER}.networks"), "none_attached"),
        Err(error) => CheckResult::fail(
            format!("{SECTION_DOCKER}.networks"),
            error_code("inspect_failed", &error),
        ),
    }];
    if let Some(port) = expectations.mcp_port {
        let key = format!("{SECTION_DOCKER}.port.{port}");
        checks.push(match docker.port_mappings() {
            Ok(mappings) => match mappings.iter().find(|mapping| mapping.container_port == port) {
                Some(mapping) => CheckResult::pass(key, "mapped").with_target(mapping.host.clone()),
                None => CheckResult::fail(key, "not_mapped")
                    .with_action(format!("publish container port {port}")),
            },
            Err(error) => CheckResult::fail(key, error_code("port_failed", &error)),
        });
    }
    checks.push(match docker.resource_usage() {
        Ok(Some(usage)) => CheckResult::pass(format!("{SECTION_DOCKER}.resources"), "available")
            .with_target(format!("cpu={} memory={}", usage.cpu_percent, usage.memory)),
        Ok(None) => CheckResult::warn(format!("{SECTION_DOCKER}.resources"), "unavailable"),
        Err(error) => CheckResult::warn(
            format!("{SECTION_DOCKER}.resources"),
            error_code("stats_failed", &error),
        ),
    });
    ComponentReport::from_checks(SECTION_DOCKER, checks)
}

/// Inspects the running container's environment, files, modules and wiring.
#[tracing::instrument(skip_all)]
pub fn run_config_check<R: CommandRunner, G>(
    probes: StackProbes<'_, R, G>,
    expectations: &ConfigExpectations,
) -> ConfigCheckReport {
    let container_key = format!("{SECTION_CONTAINER}.running");
    let gate = match probes.docker.container_status() {
        Ok(Some(status)) if status.running => {
            CheckResult::pass(container_key, "running").with_target(status.name)
        }
        Ok(Some(status)) => {
            CheckResult::fail(container_key, "not_running").with_target(status.name)
        }
        Ok(None) => CheckResult::fail(container_key, "container_missing")
            .with_target(probes.docker.container()),
        Err(error) => CheckResult::fail(container_key, error_code("docker_unavailable", &error)),
    };
    let gate_passed = gate.status == CheckStatus::Pass;
    let mut components = vec![ComponentReport::from_checks(SECTION_CONTAINER, vec![gate])];
    if gate_passed {
        components.push(check_environment(probes, expectations));
        components.push(check_files(probes, expectations));
        components.push(check_modules(probes, expectations));
        components.push(check_docker_setup(probes, expectations));
    } else {
        tracing::warn!(
            container = probes.docker.container(),
            "container not running, config check stopped"
        );
    }
    let passed = components.iter().all(|component| component.healthy);
    ConfigCheckReport { components, passed }
}

pub fn render_config_check_report(report: &ConfigCheckReport) -> String {
    let counts = count_checks(report.components.iter().flat_map(|c| c.checks.iter()));
    let mut lines = vec![format!(
        "config summary: passed={} sections={} checks={} pass={} warn={} fail={}",
        report.passed,
        report.components.len(),
        counts.total(),
        counts.pass,
        counts.warn,
        counts.fail,
    )];
    lines.extend(render_component_lines("config", &report.components));
    lines.join("\n")
}

pub fn render_config_check_report_json(report: &ConfigCheckReport) -> String {
    let counts = count_checks(report.components.iter().flat_map(|c| c.checks.iter()));
    json!({
        "summary": {
            "passed": report.passed,
            "checks": counts.total(),
            "pass": counts.pass,
            "warn": counts.warn,
            "fail": counts.fail,
        },
        "sections": report
            .components
            .iter()
            .map(ComponentReport::to_json)
            .collect::<Vec<_>>(),
    })
    .to_string()
}
