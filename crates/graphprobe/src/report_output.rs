use std::path::Path;

use anyhow::{Context, Result};
use graphprobe_cli::ReportArgs;
use graphprobe_core::write_report_atomic;

/// Prints the text or JSON rendering and mirrors it to `--output` when given.
pub(crate) fn emit_report(
    report: &ReportArgs,
    render_text: impl FnOnce() -> String,
    render_json: impl FnOnce() -> String,
) -> Result<()> {
    let rendered = if report.json {
        render_json()
    } else {
        render_text()
    };
    emit(&rendered, report.output.as_deref())
}

pub(crate) fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    println!("{rendered}");
    if let Some(path) = output {
        write_report_atomic(path, &format!("{rendered}\n"))
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(())
}
