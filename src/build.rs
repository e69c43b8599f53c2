//! Collaborator build pipeline: backend packages, then frontend assets

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::BuildConfig;
use crate::console;
use crate::error::ProvisionError;
use crate::process::{CommandRunner, CommandSpec};

/// The two build steps, in execution order
pub fn build_steps(
    build: &BuildConfig,
    install_dir: &Path,
    timeout: Duration,
) -> Result<[(&'static str, CommandSpec); 2]> {
    let step = |label: &'static str, argv: &[String]| -> Result<(&'static str, CommandSpec)> {
        let spec = CommandSpec::from_argv(argv).ok_or(ProvisionError::EmptyValue {
            what: "build command",
        })?;
        Ok((label, spec.current_dir(install_dir).timeout(timeout)))
    };
    Ok([
        step("backend packages", &build.backend)?,
        step("frontend assets", &build.frontend)?,
    ])
}

/// Run both steps; the first failure aborts, nothing is retried
pub async fn run<R: CommandRunner>(
    build: &BuildConfig,
    install_dir: &Path,
    runner: &R,
    timeout: Duration,
) -> Result<()> {
    for (label, spec) in build_steps(build, install_dir, timeout)? {
        console::info(format!("Building {label} ({})...", spec.display()));
        runner
            .run(&spec)
            .await
            .with_context(|| format!("Build step failed: {label}"))?;
    }
    console::success("Application built");
    Ok(())
}
