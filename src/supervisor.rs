//! PM2 registration and boot-time start
//!
//! Optional stage. When declined nothing here runs, and the completion
//! report falls back to manual start instructions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::console;
use crate::dependencies::{Dependency, StrategyContext, select};
use crate::error::ProvisionError;
use crate::process::{CommandRunner, CommandSpec};
use crate::prompt::{Prompter, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupervisorChoice {
    pub enabled: bool,
    pub auto_start_on_boot: bool,
}

/// Ask whether to supervise, and only then whether to start on boot
pub fn choose<P: Prompter>(prompter: &mut P) -> Result<SupervisorChoice> {
    let use_pm2 = Question::UseSupervisor;
    if !prompter.confirm(use_pm2, use_pm2.default_confirm())? {
        return Ok(SupervisorChoice::default());
    }
    let boot = Question::SupervisorBootStart;
    Ok(SupervisorChoice {
        enabled: true,
        auto_start_on_boot: prompter.confirm(boot, boot.default_confirm())?,
    })
}

/// What the supervisor should run
#[derive(Debug, Clone)]
pub struct ServiceSpec<'a> {
    pub name: &'a str,
    pub entry_point: &'a str,
    pub install_dir: &'a Path,
}

/// Account `pm2 startup` registers the init script for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub user: String,
    pub home: PathBuf,
}

impl ServiceAccount {
    pub fn current() -> Option<Self> {
        let user = nix::unistd::User::from_uid(nix::unistd::getuid()).ok()??;
        Some(Self {
            user: user.name,
            home: user.dir,
        })
    }
}

pub async fn install<R: CommandRunner>(
    choice: SupervisorChoice,
    service: &ServiceSpec<'_>,
    ctx: &StrategyContext,
    runner: &R,
    timeout: Duration,
) -> Result<()> {
    if !choice.enabled {
        info!("supervisor declined; skipping PM2");
        return Ok(());
    }

    let pm2 = ensure_pm2(ctx, runner, timeout).await?;
    register(service, runner, timeout).await?;

    if choice.auto_start_on_boot {
        let account = if runner.is_privileged() {
            None
        } else {
            ServiceAccount::current()
        };
        for step in boot_commands(&pm2, account.as_ref(), timeout) {
            runner
                .run(&step)
                .await
                .context("Failed to configure PM2 boot start")?;
        }
        console::success("PM2 will restart the application on boot");
    }
    Ok(())
}

/// PM2 has no minimum version; any install is accepted
async fn ensure_pm2<R: CommandRunner>(
    ctx: &StrategyContext,
    runner: &R,
    timeout: Duration,
) -> Result<PathBuf> {
    if let Some(path) = runner.locate("pm2") {
        debug!("pm2 found at {}", path.display());
        return Ok(path);
    }

    let dependency = Dependency::Supervisor;
    let strategy = select(dependency, ctx).ok_or_else(|| ProvisionError::NoInstallStrategy {
        dependency,
        os: ctx.os.to_string(),
    })?;
    console::info(format!("Installing PM2 via {}...", strategy.label));
    for step in strategy.steps {
        runner
            .run(&step.timeout(timeout))
            .await
            .context("Failed to install PM2")?;
    }

    runner.locate("pm2").ok_or_else(|| {
        ProvisionError::DependencyUnsatisfied {
            dependency,
            detail: "pm2 is not on PATH after installation".to_string(),
        }
        .into()
    })
}

/// Start the service, or restart it when a process of that name already exists
async fn register<R: CommandRunner>(
    service: &ServiceSpec<'_>,
    runner: &R,
    timeout: Duration,
) -> Result<()> {
    let describe = CommandSpec::new("pm2")
        .args(["describe", service.name])
        .timeout(timeout);
    let known = runner
        .output(&describe)
        .await
        .map(|out| out.success)
        .unwrap_or(false);

    let command = if known {
        CommandSpec::new("pm2").args(["restart", service.name, "--update-env"])
    } else {
        CommandSpec::new("pm2").args(["start", service.entry_point, "--name", service.name])
    };
    runner
        .run(&command.current_dir(service.install_dir).timeout(timeout))
        .await
        .with_context(|| format!("Failed to register {} with PM2", service.name))?;

    console::success(format!("{} is running under PM2", service.name));
    Ok(())
}

/// `pm2 startup` then `pm2 save`
///
/// Without root, the startup script is installed through sudo for `account`
/// with PM2's own directory added to the search path.
pub fn boot_commands(
    pm2: &Path,
    account: Option<&ServiceAccount>,
    timeout: Duration,
) -> Vec<CommandSpec> {
    let startup = match account {
        None => CommandSpec::new("pm2").arg("startup"),
        Some(account) => {
            let mut path = std::env::var("PATH").unwrap_or_default();
            if let Some(bin) = pm2.parent() {
                path = format!("{path}:{}", bin.display());
            }
            CommandSpec::new("env")
                .arg(format!("PATH={path}"))
                .arg(pm2.display().to_string())
                .args(["startup", "-u", account.user.as_str(), "--hp"])
                .arg(account.home.display().to_string())
                .elevated()
        }
    };
    vec![
        startup.timeout(timeout),
        CommandSpec::new("pm2").arg("save").timeout(timeout),
    ]
}
