use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One probe outcome. `code` is a stable reason code, `target` what was probed.
pub struct CheckResult {
    pub key: String,
    pub status: CheckStatus,
    pub code: String,
    pub target: Option<String>,
    pub action: Option<String>,
}

impl CheckResult {
    pub fn new(key: impl Into<String>, status: CheckStatus, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status,
            code: code.into(),
            target: None,
            action: None,
        }
    }

    pub fn pass(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(key, CheckStatus::Pass, code)
    }

    pub fn warn(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(key, CheckStatus::Warn, code)
    }

    pub fn fail(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(key, CheckStatus::Fail, code)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "key": self.key,
            "status": self.status.as_str(),
            "code": self.code,
            "target": self.target,
            "action": self.action,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckCounts {
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
}

impl CheckCounts {
    pub fn total(&self) -> usize {
        self.pass + self.warn + self.fail
    }
}

pub fn count_checks<'a>(checks: impl IntoIterator<Item = &'a CheckResult>) -> CheckCounts {
    let mut counts = CheckCounts::default();
    for check in checks {
        match check.status {
            CheckStatus::Pass => counts.pass += 1,
            CheckStatus::Warn => counts.warn += 1,
            CheckStatus::Fail => counts.fail += 1,
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentReport {
    pub name: String,
    pub checks: Vec<CheckResult>,
    pub healthy: bool,
    pub skipped: bool,
}

impl ComponentReport {
    /// Healthy when no check failed.
    pub fn from_checks(name: &str, checks: Vec<CheckResult>) -> Self {
        let healthy = !checks.iter().any(|check| check.status == CheckStatus::Fail);
        Self {
            name: name.to_string(),
            checks,
            healthy,
            skipped: false,
        }
    }

    pub fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: vec![CheckResult::warn(format!("{name}.skipped"), "skipped_by_operator")],
            healthy: false,
            skipped: true,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "healthy": self.healthy,
            "skipped": self.skipped,
            "checks": self.checks.iter().map(CheckResult::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Line-oriented rendering shared by the health and config reports.
pub(crate) fn render_component_lines(prefix: &str, components: &[ComponentReport]) -> Vec<String> {
    let mut lines = Vec::new();
    for component in components {
        lines.push(format!(
            "{prefix} component: name={} healthy={} skipped={} checks={}",
            component.name,
            component.healthy,
            component.skipped,
            component.checks.len()
        ));
        for check in &component.checks {
            lines.push(format!(
                "{prefix} check: key={} status={} code={} target={} action={}",
                check.key,
                check.status.as_str(),
                check.code,
                check.target.as_deref().unwrap_or("none"),
                check.action.as_deref().unwrap_or("none"),
            ));
        }
    }
    lines
}

/// Reason code for a probe error: a prefix plus the error's first line.
pub(crate) fn error_code(prefix: &str, error: &dyn std::fmt::Display) -> String {
    let message = graphprobe_core::single_line(&error.to_string());
    format!("{prefix}:{}", graphprobe_core::preview(&message, 160))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_component_health_follows_fail_checks() {
        let healthy = ComponentReport::from_checks(
            "ollama",
            vec![
                CheckResult::pass("ollama.server", "models=2"),
                CheckResult::warn("ollama.note", "slow"),
            ],
        );
        assert!(healthy.healthy);
        let failed = ComponentReport::from_checks(
            "neo4j",
            vec![CheckResult::fail("neo4j.connectivity", "unreachable")],
        );
        assert!(!failed.healthy);
    }

    #[test]
    fn unit_render_component_lines_uses_none_placeholders() {
        let component = ComponentReport::from_checks(
            "docker_container",
            vec![CheckResult::pass("docker_container.running", "running")
                .with_target("mcp_server-graphiti-mcp-1")],
        );
        let lines = render_component_lines("health", &[component]);
        assert_eq!(
            lines[0],
            "health component: name=docker_container healthy=true skipped=false checks=1"
        );
        assert_eq!(
            lines[1],
            "health check: key=docker_container.running status=pass code=running target=mcp_server-graphiti-mcp-1 action=none"
        );
    }

    #[test]
    fn unit_error_code_is_single_line_and_bounded() {
        let code = error_code("unreachable", &"connection refused\n  at socket");
        assert_eq!(code, "unreachable:connection refused at socket");
        let long = "x".repeat(500);
        assert!(error_code("failed", &long).chars().count() < 200);
    }

    #[test]
    fn unit_count_checks_tallies_statuses() {
        let checks = [
            CheckResult::pass("a", "ok"),
            CheckResult::warn("b", "w"),
            CheckResult::fail("c", "f"),
            CheckResult::fail("d", "f"),
        ];
        let counts = count_checks(&checks);
        assert_eq!((counts.pass, counts.warn, counts.fail), (1, 1, 2));
        assert_eq!(counts.total(), 4);
    }
}
