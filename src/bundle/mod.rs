//! Application bundle retrieval
//!
//! - `fetch` - download with curl (preferred) or wget
//! - `extract` - unzip into a scratch directory and hoist the single
//!   top-level directory into the install directory
//!
//! Failures leave whatever was created so far in place; see the workflow's
//! abort report for the list.

mod extract;
mod fetch;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::console;
use crate::error::ProvisionError;
use crate::process::CommandRunner;
use crate::prompt::{Prompter, Question};

pub use extract::{hoist_contents, locate_top_level};
pub use fetch::download_command;

/// Downloaded archive, inside the install directory while it exists
pub const ARCHIVE_NAME: &str = ".qid-bundle.zip";
/// Extraction scratch directory, inside the install directory while it exists
pub const SCRATCH_DIR: &str = ".qid-extract";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallTarget {
    pub directory: PathBuf,
    pub source_url: String,
}

/// Validate the source URL and settle the install directory
///
/// Nothing touches the filesystem here; an empty URL aborts before any
/// directory exists. `preset_dir` skips the directory prompt.
pub fn resolve_target<P: Prompter>(
    source_url: &str,
    default_dir: &Path,
    preset_dir: Option<&Path>,
    prompter: &mut P,
) -> Result<InstallTarget> {
    let source_url = source_url.trim();
    if source_url.is_empty() {
        return Err(ProvisionError::EmptyValue {
            what: "bundle source URL",
        }
        .into());
    }

    let directory = match preset_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let default = default_dir.display().to_string();
            let answer = prompter.input(Question::InstallDir, &default)?;
            match answer.trim() {
                "" => default_dir.to_path_buf(),
                chosen => PathBuf::from(chosen),
            }
        }
    };

    Ok(InstallTarget {
        directory,
        source_url: source_url.to_string(),
    })
}

/// Create the install directory; `true` when it did not exist before
pub fn prepare(target: &InstallTarget) -> Result<bool> {
    let existed = target.directory.exists();
    fs::create_dir_all(&target.directory).with_context(|| {
        format!(
            "Failed to create install directory {}",
            target.directory.display()
        )
    })?;
    info!("install directory: {}", target.directory.display());
    Ok(!existed)
}

/// Download the bundle into the install directory and unpack it in place
pub async fn fetch<R: CommandRunner>(
    target: &InstallTarget,
    runner: &R,
    timeout: Duration,
) -> Result<()> {
    let directory = &target.directory;
    let archive = directory.join(ARCHIVE_NAME);
    fetch::download(&target.source_url, &archive, runner, timeout).await?;

    let scratch = directory.join(SCRATCH_DIR);
    extract::unpack(&archive, &scratch, runner, timeout).await?;

    let top = locate_top_level(&scratch)?.ok_or_else(|| ProvisionError::MalformedArchive {
        archive: archive.clone(),
    })?;
    hoist_contents(&top, directory)?;

    fs::remove_dir_all(&scratch)
        .with_context(|| format!("Failed to remove {}", scratch.display()))?;
    fs::remove_file(&archive).with_context(|| format!("Failed to remove {}", archive.display()))?;

    console::success(format!("Bundle unpacked into {}", directory.display()));
    Ok(())
}

/// Later stages only run against a directory that exists and has content
pub fn ensure_populated(dir: &Path) -> Result<()> {
    let populated = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if populated {
        Ok(())
    } else {
        Err(ProvisionError::EmptyInstallDir {
            path: dir.to_path_buf(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::FakeRunner;
    use crate::prompt::{Answer, ScriptedPrompter};

    const URL: &str = "https://example.test/qid-oauth-1.0.0.zip";

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn target(dir: &Path) -> InstallTarget {
        InstallTarget {
            directory: dir.to_path_buf(),
            source_url: URL.to_string(),
        }
    }

    #[test]
    fn prompted_directory_falls_back_to_default() {
        let mut prompter = ScriptedPrompter::new().answer(Question::InstallDir, Answer::Text("  ".into()));
        let target = resolve_target(URL, Path::new("./qid-oauth"), None, &mut prompter).unwrap();
        assert_eq!(target.directory, PathBuf::from("./qid-oauth"));

        let mut prompter =
            ScriptedPrompter::new().answer(Question::InstallDir, Answer::Text("/srv/qid".into()));
        let target = resolve_target(URL, Path::new("./qid-oauth"), None, &mut prompter).unwrap();
        assert_eq!(target.directory, PathBuf::from("/srv/qid"));
    }

    #[test]
    fn empty_url_aborts_before_asking_or_creating() {
        let mut prompter = ScriptedPrompter::new();
        let err = resolve_target("   ", Path::new("./qid-oauth"), None, &mut prompter).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::EmptyValue { .. })
        ));
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn prepare_reports_whether_it_created_the_directory() {
        let base = tempfile::tempdir().unwrap();
        let fresh = target(&base.path().join("app"));
        assert!(prepare(&fresh).unwrap());
        assert!(!prepare(&fresh).unwrap());
    }

    #[tokio::test]
    async fn single_top_level_directory_is_flattened() {
        let base = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new()
            .tool("curl", "curl 8.5.0")
            .tool("unzip", "UnZip 6.00")
            .archive(&[
                "qid-oauth-1.0.0/",
                "qid-oauth-1.0.0/package.json",
                "qid-oauth-1.0.0/server.js",
                "qid-oauth-1.0.0/client/src/index.js",
            ]);

        fetch(&target(base.path()), &runner, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(names(base.path()), vec!["client", "package.json", "server.js"]);
        assert!(base.path().join("client/src/index.js").is_file());
        assert_eq!(runner.ran_matching("curl -fsSL -o"), 1);
    }

    #[tokio::test]
    async fn archive_without_directory_moves_nothing() {
        let base = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new()
            .tool("curl", "curl 8.5.0")
            .tool("unzip", "UnZip 6.00")
            .archive(&["README.md", "server.js"]);

        let err = fetch(&target(base.path()), &runner, Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::MalformedArchive { .. })
        ));
        // only our own artifacts, nothing hoisted
        assert_eq!(names(base.path()), vec![ARCHIVE_NAME, SCRATCH_DIR]);
    }

    #[tokio::test]
    async fn first_directory_wins_when_ambiguous() {
        let base = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new()
            .tool("wget", "GNU Wget 1.21.3")
            .tool("unzip", "UnZip 6.00")
            .archive(&["b-extra/", "b-extra/ignored.txt", "a-main/", "a-main/server.js"]);

        fetch(&target(base.path()), &runner, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(names(base.path()), vec!["server.js"]);
        assert_eq!(runner.ran_matching("wget -q -O"), 1);
    }

    #[tokio::test]
    async fn no_download_tool_is_fatal() {
        let base = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new().tool("unzip", "UnZip 6.00");

        let err = fetch(&target(base.path()), &runner, Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::ToolMissing { .. })
        ));
        assert!(runner.ran().is_empty());
    }

    #[test]
    fn populated_check() {
        let base = tempfile::tempdir().unwrap();
        assert!(ensure_populated(&base.path().join("missing")).is_err());
        assert!(ensure_populated(base.path()).is_err());

        fs::write(base.path().join("package.json"), "{}").unwrap();
        assert!(ensure_populated(base.path()).is_ok());
    }
}
