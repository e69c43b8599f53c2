//! Check → ask → install → re-verify for a single dependency

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use super::{Dependency, DependencyRequirement, Strategy, StrategyContext, Verdict, select};
use crate::console;
use crate::detection::{HostProfile, Prober};
use crate::error::ProvisionError;
use crate::process::CommandRunner;
use crate::prompt::{Prompter, Question};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Requirement met; `installed_with` names the recipe when one ran
    Satisfied { installed_with: Option<&'static str> },
    AbortedByUser,
}

/// Make sure one requirement holds, installing it with permission
///
/// At most one strategy runs per call. A failed re-verification is fatal;
/// there is no second attempt and no fallback recipe.
pub async fn ensure<R, P>(
    requirement: &DependencyRequirement,
    profile: &HostProfile,
    ctx: &StrategyContext,
    prober: &Prober,
    runner: &R,
    prompter: &mut P,
) -> Result<EnsureOutcome>
where
    R: CommandRunner,
    P: Prompter,
{
    let dependency = requirement.dependency;
    let verdict = requirement.evaluate_profile(profile);
    if verdict.is_satisfied() {
        info!("{dependency}: {}", verdict.describe());
        return Ok(EnsureOutcome::Satisfied {
            installed_with: None,
        });
    }

    console::warning(format!("{dependency}: {}", verdict.describe()));
    let question = Question::InstallDependency(dependency);
    if !prompter.confirm(question, question.default_confirm())? {
        return Ok(EnsureOutcome::AbortedByUser);
    }

    let strategy = select(dependency, ctx).ok_or_else(|| ProvisionError::NoInstallStrategy {
        dependency,
        os: ctx.os.to_string(),
    })?;

    console::info(format!("Installing {dependency} via {}...", strategy.label));
    for step in &strategy.steps {
        runner
            .run(step)
            .await
            .with_context(|| format!("Failed to install {dependency} via {}", strategy.label))?;
    }

    if let Some(dir) = installed_bin_dir(dependency, &strategy, runner).await? {
        info!("{dependency}: searching {} for installed tools", dir.display());
        runner.prepend_path(dir);
    }

    let rechecked = prober.probe_tools(dependency.tools(), runner).await;
    let verdict = requirement.evaluate(|tool| rechecked.get(&tool));
    match verdict {
        Verdict::Satisfied { .. } => {
            console::success(format!("{dependency} installed ({})", verdict.describe()));
            Ok(EnsureOutcome::Satisfied {
                installed_with: Some(strategy.label),
            })
        }
        other => Err(ProvisionError::DependencyUnsatisfied {
            dependency,
            detail: other.describe(),
        }
        .into()),
    }
}

/// Directory holding what `strategy` installed, when it lands outside PATH
async fn installed_bin_dir<R: CommandRunner>(
    dependency: Dependency,
    strategy: &Strategy,
    runner: &R,
) -> Result<Option<PathBuf>> {
    let Some(query) = &strategy.bin_query else {
        return Ok(None);
    };
    let unresolved = |detail: String| ProvisionError::DependencyUnsatisfied { dependency, detail };

    let out = runner.output(query).await?;
    if !out.success {
        return Err(unresolved(format!(
            "{} installed nothing it can locate ({})",
            strategy.label, out.status
        ))
        .into());
    }
    // nvm may print notices first; the executable path is the last line
    let executable = out
        .stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .map(Path::new)
        .ok_or_else(|| unresolved(format!("{} reported no executable path", strategy.label)))?;
    let dir = executable
        .parent()
        .filter(|dir| dir.is_absolute())
        .ok_or_else(|| {
            unresolved(format!(
                "unexpected executable path from {}: {}",
                strategy.label,
                executable.display()
            ))
        })?;
    Ok(Some(dir.to_path_buf()))
}
