use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tempfile::{Builder, NamedTempFile};

const STAGING_PREFIX: &str = ".graphprobe-report.";

/// Replaces `path` with `content` through a staged file in the same directory.
///
/// Readers see either the previous report or the complete new one. Missing
/// parent directories are created. The staged file is removed whenever a step
/// fails.
pub fn write_report_atomic(path: &Path, content: &str) -> Result<()> {
    if path.file_name().is_none() {
        bail!("report path '{}' has no file name", path.display());
    }
    if path.is_dir() {
        bail!("report path '{}' is a directory", path.display());
    }
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create report directory {}", parent.display()))?;
    let staged = stage_in(parent, content)?;
    commit(staged, path)
}

fn stage_in(dir: &Path, content: &str) -> Result<NamedTempFile> {
    let mut staged = Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("failed to stage report in {}", dir.display()))?;
    staged
        .write_all(content.as_bytes())
        .context("failed to write staged report")?;
    staged
        .as_file()
        .sync_all()
        .context("failed to flush staged report")?;
    Ok(staged)
}

fn commit(staged: NamedTempFile, path: &Path) -> Result<()> {
    // On failure the error owns the staged file and deletes it on drop.
    staged
        .persist(path)
        .map_err(|error| anyhow::Error::new(error.error))
        .with_context(|| format!("failed to move report into {}", path.display()))?;
    tracing::debug!(path = %path.display(), "report persisted");
    Ok(())
}
