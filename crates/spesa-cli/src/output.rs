//! Artifact files written under the configured output directory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

/// Writes `value` as pretty JSON to `<dir>/<name>.json`, creating `dir` if needed.
pub(crate) fn write_json<T: Serialize>(
    dir: &Path,
    name: &str,
    value: &T,
) -> anyhow::Result<PathBuf> {
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {name}"))?;
    write_text(dir, &format!("{name}.json"), &body)
}

/// Writes `body` verbatim to `<dir>/<file_name>`, creating `dir` if needed.
pub(crate) fn write_text(dir: &Path, file_name: &str, body: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let path = dir.join(file_name);
    std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = body.len(), "artifact written");
    Ok(path)
}
