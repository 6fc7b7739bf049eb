use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Writes fully rendered output to `dir/filename`, or to stdout when the
/// filename is `-`. The file goes through a temp path in the destination
/// directory and an atomic rename, so a failed export never leaves a
/// half-written file behind.
pub fn emit(dir: &Path, filename: &str, contents: &str) -> Result<Option<PathBuf>> {
    if filename == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(contents.as_bytes())
            .context("failed to write to stdout")?;
        return Ok(None);
    }

    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let target = dir.join(filename);
    let mut temp = tempfile::Builder::new()
        .prefix(".plx-export-")
        .tempfile_in(dir)
        .with_context(|| format!("failed to create temp file under {}", dir.display()))?;
    temp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {}", target.display()))?;
    temp.persist(&target)
        .map_err(|err| anyhow!("failed to persist {}: {}", target.display(), err.error))?;
    Ok(Some(target))
}
