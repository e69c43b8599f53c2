//! Provisioning pipeline
//!
//! Probe → dependencies → bundle → runtime config → build → supervisor →
//! report. Stages run strictly in that order and the first error ends the
//! run. Everything a stage needs travels in [`RunState`]; nothing is
//! threaded through globals or the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};

use crate::bundle::{self, InstallTarget};
use crate::build;
use crate::config::ProvisionConfig;
use crate::console;
use crate::dependencies::{Dependency, EnsureOutcome, StrategyContext, ensure, requirements_from};
use crate::detection::{HostProfile, Prober, Tool};
use crate::error::ProvisionError;
use crate::process::CommandRunner;
use crate::prompt::Prompter;
use crate::report::CompletionReport;
use crate::runtime_config::{self, RuntimeConfig};
use crate::supervisor::{self, ServiceSpec, SupervisorChoice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Probe,
    Dependencies,
    Fetch,
    Configure,
    Build,
    Supervisor,
    Report,
}

impl Stage {
    pub const PIPELINE: [Stage; 7] = [
        Stage::Probe,
        Stage::Dependencies,
        Stage::Fetch,
        Stage::Configure,
        Stage::Build,
        Stage::Supervisor,
        Stage::Report,
    ];

    /// Stages that may only start once the install directory is populated
    pub fn requires_install_dir(self) -> bool {
        matches!(
            self,
            Stage::Configure | Stage::Build | Stage::Supervisor | Stage::Report
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Probe => "environment probe",
            Stage::Dependencies => "dependency check",
            Stage::Fetch => "bundle download",
            Stage::Configure => "configuration",
            Stage::Build => "build",
            Stage::Supervisor => "supervisor setup",
            Stage::Report => "completion report",
        };
        f.write_str(name)
    }
}

/// Per-run choices made outside the configuration file
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Pre-answers the install directory prompt
    pub install_dir: Option<PathBuf>,
    /// Remove the install directory on abort, if this run created it
    pub cleanup_on_failure: bool,
}

#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub profile: HostProfile,
    /// Dependencies that had to be installed, with the recipe used
    pub installed: Vec<(Dependency, &'static str)>,
    pub target: InstallTarget,
    pub runtime: RuntimeConfig,
    pub supervisor: SupervisorChoice,
    pub report: CompletionReport,
}

/// Everything produced so far in one run
#[derive(Debug, Default)]
struct RunState {
    stage: Option<Stage>,
    target: Option<InstallTarget>,
    created_install_dir: Option<PathBuf>,
    /// Files and directories this run wrote, in creation order
    created: Vec<PathBuf>,
}

impl RunState {
    fn enter(&mut self, stage: Stage) -> Result<()> {
        if stage.requires_install_dir() {
            match &self.target {
                Some(target) => bundle::ensure_populated(&target.directory)?,
                None => {
                    return Err(ProvisionError::EmptyInstallDir {
                        path: PathBuf::new(),
                    }
                    .into());
                }
            }
        }
        info!("stage: {stage}");
        self.stage = Some(stage);
        Ok(())
    }

    fn install_dir(&self) -> Result<&Path> {
        self.target
            .as_ref()
            .map(|t| t.directory.as_path())
            .ok_or_else(|| {
                ProvisionError::EmptyInstallDir {
                    path: PathBuf::new(),
                }
                .into()
            })
    }
}

pub struct Provisioner<R, P> {
    config: ProvisionConfig,
    options: InstallOptions,
    runner: R,
    prompter: P,
    prober: Prober,
}

impl<R: CommandRunner, P: Prompter> Provisioner<R, P> {
    pub fn new(config: ProvisionConfig, options: InstallOptions, runner: R, prompter: P) -> Self {
        let prober = Prober::new(config.timeouts.probe());
        Self {
            config,
            options,
            runner,
            prompter,
            prober,
        }
    }

    pub fn with_prober(mut self, prober: Prober) -> Self {
        self.prober = prober;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Run every stage; on failure, report what was left behind
    pub async fn run(&mut self) -> Result<ProvisionOutcome> {
        let mut state = RunState::default();
        match self.run_stages(&mut state).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.abort(&state);
                Err(err)
            }
        }
    }

    async fn run_stages(&mut self, state: &mut RunState) -> Result<ProvisionOutcome> {
        state.enter(Stage::Probe)?;
        console::info("Checking the environment...");
        let profile = self.prober.probe(&self.runner).await;
        if profile.os.is_known() {
            console::info(format!("Detected {}", profile.os));
        } else {
            console::warning("Unrecognised operating system; automatic installs are limited");
        }

        state.enter(Stage::Dependencies)?;
        let installed = self.ensure_dependencies(&profile).await?;

        state.enter(Stage::Fetch)?;
        let target = bundle::resolve_target(
            &self.config.resolved_source_url(),
            &self.config.install_dir,
            self.options.install_dir.as_deref(),
            &mut self.prompter,
        )?;
        if bundle::prepare(&target)? {
            state.created_install_dir = Some(target.directory.clone());
            state.created.push(target.directory.clone());
        }
        state.target = Some(target.clone());
        bundle::fetch(&target, &self.runner, self.config.timeouts.command()).await?;

        state.enter(Stage::Configure)?;
        let written = runtime_config::collect(
            state.install_dir()?,
            &self.config.database_uri,
            self.config.port,
            &mut self.prompter,
        )?;
        state.created.push(written.settings_path.clone());
        state.created.push(written.env_path.clone());

        state.enter(Stage::Build)?;
        build::run(
            &self.config.build,
            state.install_dir()?,
            &self.runner,
            self.config.timeouts.command(),
        )
        .await?;

        state.enter(Stage::Supervisor)?;
        let choice = supervisor::choose(&mut self.prompter)?;
        let service = ServiceSpec {
            name: &self.config.service_name,
            entry_point: &self.config.entry_point,
            install_dir: state.install_dir()?,
        };
        supervisor::install(
            choice,
            &service,
            &self.strategy_context(&profile),
            &self.runner,
            self.config.timeouts.command(),
        )
        .await?;

        state.enter(Stage::Report)?;
        let report =
            CompletionReport::gather(state.install_dir()?, choice, &self.config.service_name)?;
        report.print();

        Ok(ProvisionOutcome {
            profile,
            installed,
            target,
            runtime: written.config,
            supervisor: choice,
            report,
        })
    }

    /// Ensure each requirement in order, refreshing tool state after an install
    ///
    /// Installing the runtime also brings its package manager, so the next
    /// check has to see the refreshed tools rather than the first snapshot.
    async fn ensure_dependencies(
        &mut self,
        profile: &HostProfile,
    ) -> Result<Vec<(Dependency, &'static str)>> {
        let ctx = self.strategy_context(profile);
        let mut current = profile.clone();
        let mut installed = Vec::new();

        for requirement in requirements_from(&self.config.requirements) {
            let outcome = ensure(
                &requirement,
                &current,
                &ctx,
                &self.prober,
                &self.runner,
                &mut self.prompter,
            )
            .await?;
            match outcome {
                EnsureOutcome::Satisfied {
                    installed_with: Some(label),
                } => {
                    installed.push((requirement.dependency, label));
                    current.tools = self.prober.probe_tools(&Tool::ALL, &self.runner).await;
                }
                EnsureOutcome::Satisfied { installed_with: None } => {}
                EnsureOutcome::AbortedByUser => {
                    return Err(ProvisionError::DependencyDeclined {
                        dependency: requirement.dependency,
                    }
                    .into());
                }
            }
        }
        console::success("All dependencies satisfied");
        Ok(installed)
    }

    fn strategy_context(&self, profile: &HostProfile) -> StrategyContext {
        StrategyContext {
            os: profile.os,
            runtime_major: self.config.requirements.runtime_major,
            database_major: self.config.requirements.database_major,
            version_manager: profile.version_manager.clone(),
        }
    }

    /// Best-effort abort hook: list what this run created, optionally remove it
    fn abort(&self, state: &RunState) {
        if let Some(stage) = state.stage {
            warn!("aborted during {stage}");
            console::warning(format!("Installation aborted during {stage}"));
        }
        if state.created.is_empty() {
            return;
        }

        let mut removed = false;
        if self.options.cleanup_on_failure {
            if let Some(dir) = &state.created_install_dir {
                match fs::remove_dir_all(dir) {
                    Ok(()) => {
                        removed = true;
                        console::info(format!("Removed {}", dir.display()));
                    }
                    Err(e) => warn!("could not remove {}: {e}", dir.display()),
                }
            }
        }
        if !removed {
            console::warning("Left in place by this run:");
            for path in &state.created {
                console::line(format!("  {}", path.display()));
            }
        }
    }
}
