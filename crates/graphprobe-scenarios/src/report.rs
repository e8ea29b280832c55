use graphprobe_diagnostics::{CheckStatus, ComponentReport};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Ordered steps of one validation flow; passes while no step failed.
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepResult>,
    pub passed: bool,
}

impl ScenarioReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
            passed: true,
        }
    }

    pub fn record(
        &mut self,
        name: impl Into<String>,
        status: CheckStatus,
        detail: impl Into<String>,
    ) {
        let step = StepResult {
            name: name.into(),
            status,
            detail: detail.into(),
        };
        tracing::debug!(
            scenario = %self.name,
            step = %step.name,
            status = step.status.as_str(),
            "scenario step"
        );
        if status == CheckStatus::Fail {
            self.passed = false;
        }
        self.steps.push(step);
    }

    pub fn pass(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.record(name, CheckStatus::Pass, detail);
    }

    pub fn warn(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.record(name, CheckStatus::Warn, detail);
    }

    pub fn fail(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.record(name, CheckStatus::Fail, detail);
    }

    /// One step per check of a diagnostics component.
    pub fn from_component(component: &ComponentReport) -> Self {
        let mut report = Self::new(&component.name);
        for check in &component.checks {
            report.record(check.key.clone(), check.status, check.code.clone());
        }
        report.passed = component.healthy;
        report
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "passed": self.passed,
            "steps": self
                .steps
                .iter()
                .map(|step| json!({
                    "name": step.name,
                    "status": step.status.as_str(),
                    "detail": step.detail,
                }))
                .collect::<Vec<_>>(),
        })
    }
}

pub fn render_scenario_report(report: &ScenarioReport) -> String {
    let mut lines = vec![format!(
        "scenario summary: name={} passed={} steps={}",
        report.name,
        report.passed,
        report.steps.len()
    )];
    for step in &report.steps {
        lines.push(format!(
            "scenario step: name={} status={} detail={}",
            step.name,
            step.status.as_str(),
            step.detail
        ));
    }
    lines.join("\n")
}
