use anyhow::Result;
use graphprobe_cli::ReportArgs;
use graphprobe_core::thread_sleeper;
use graphprobe_diagnostics::{
    build_status_report, render_config_check_report, render_config_check_report_json,
    render_health_report, render_health_report_json, render_status_report,
    render_status_report_json, run_config_check, run_health_check,
};
use graphprobe_scenarios::{
    render_suite_report, render_suite_report_json, run_suite, SuiteSelection,
};

use crate::report_output::emit_report;
use crate::stack_runtime::StackRuntime;

pub(crate) fn health(runtime: &StackRuntime, report: &ReportArgs, skip: &[String]) -> Result<i32> {
    let settings = runtime.config.health_settings(skip)?;
    let health = run_health_check(runtime.probes(), &settings);
    emit_report(
        report,
        || render_health_report(&health),
        || render_health_report_json(&health),
    )?;
    Ok(health.verdict.exit_code())
}

pub(crate) fn config_check(runtime: &StackRuntime, report: &ReportArgs) -> Result<i32> {
    let expectations = runtime.config.config_expectations();
    let config_report = run_config_check(runtime.probes(), &expectations);
    emit_report(
        report,
        || render_config_check_report(&config_report),
        || render_config_check_report_json(&config_report),
    )?;
    Ok(config_report.exit_code())
}

pub(crate) fn status(runtime: &StackRuntime, report: &ReportArgs) -> Result<i32> {
    let status = build_status_report(runtime.probes(), &runtime.config.status_settings());
    emit_report(
        report,
        || render_status_report(&status),
        || render_status_report_json(&status),
    )?;
    Ok(0)
}

pub(crate) fn suite(
    runtime: &StackRuntime,
    report: &ReportArgs,
    selection: SuiteSelection,
    include_reports: bool,
) -> Result<i32> {
    let settings = runtime.config.suite_settings(include_reports)?;
    let endpoint = runtime.config.mcp_endpoint()?;
    let timeout = runtime.config.command_timeout;
    let connect = || endpoint.connect(timeout);
    let mut sleeper = thread_sleeper;
    let suite_report = run_suite(runtime.probes(), &settings, &connect, selection, &mut sleeper);
    emit_report(
        report,
        || render_suite_report(&suite_report),
        || render_suite_report_json(&suite_report),
    )?;
    Ok(suite_report.exit_code())
}
