//! Unpacking and flattening of the bundle archive

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;

use crate::console;
use crate::error::ProvisionError;
use crate::process::{CommandRunner, CommandSpec};

pub(super) async fn unpack<R: CommandRunner>(
    archive: &Path,
    scratch: &Path,
    runner: &R,
    timeout: Duration,
) -> Result<()> {
    if runner.locate("unzip").is_none() {
        return Err(ProvisionError::ToolMissing {
            program: "unzip".to_string(),
        }
        .into());
    }
    // leftovers from an earlier aborted run would merge into this extraction
    if scratch.exists() {
        fs::remove_dir_all(scratch)
            .with_context(|| format!("Failed to clear {}", scratch.display()))?;
    }

    let command = CommandSpec::new("unzip")
        .args(["-q", "-o"])
        .arg(archive.display().to_string())
        .arg("-d")
        .arg(scratch.display().to_string())
        .timeout(timeout);

    let spinner = console::spinner("Extracting bundle");
    let result = runner.run(&command).await;
    spinner.finish_and_clear();

    result.with_context(|| format!("Failed to extract {}", archive.display()))
}

/// First top-level directory of an extracted archive, by name
///
/// Extra top-level directories are ignored with a warning.
pub fn locate_top_level(scratch: &Path) -> Result<Option<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(scratch)
        .with_context(|| format!("Failed to read {}", scratch.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();

    if dirs.len() > 1 {
        let ignored: Vec<String> = dirs[1..]
            .iter()
            .filter_map(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        warn!("archive has several top-level directories; ignoring {}", ignored.join(", "));
        console::warning(format!(
            "Bundle has more than one top-level directory; using {}",
            dirs[0].display()
        ));
    }
    Ok(dirs.into_iter().next())
}

/// Move every entry of `from` into `to`, replacing same-named entries
pub fn hoist_contents(from: &Path, to: &Path) -> Result<()> {
    for entry in fs::read_dir(from).with_context(|| format!("Failed to read {}", from.display()))? {
        let entry = entry?;
        let target = to.join(entry.file_name());

        if let Ok(meta) = fs::symlink_metadata(&target) {
            let removed = if meta.is_dir() {
                fs::remove_dir_all(&target)
            } else {
                fs::remove_file(&target)
            };
            removed.with_context(|| format!("Failed to replace {}", target.display()))?;
        }

        fs::rename(entry.path(), &target).with_context(|| {
            format!(
                "Failed to move {} to {}",
                entry.path().display(),
                target.display()
            )
        })?;
    }
    Ok(())
}
