//! Live command runner on top of `tokio::process`

use std::env;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::RwLock;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use tokio::process::Command;
use tokio::time::timeout;

use super::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::ProvisionError;

pub struct SystemRunner {
    privileged: bool,
    default_timeout: Duration,
    /// Directories searched ahead of the inherited PATH (e.g. nvm's bin dir)
    extra_paths: RwLock<Vec<PathBuf>>,
}

impl SystemRunner {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            privileged: nix::unistd::getuid().is_root(),
            default_timeout,
            extra_paths: RwLock::new(Vec::new()),
        }
    }

    /// Effective PATH, or `None` while nothing has been prepended
    fn search_path(&self) -> Option<OsString> {
        let mut dirs = self.extra_paths.read().ok()?.clone();
        if dirs.is_empty() {
            return None;
        }
        if let Some(inherited) = env::var_os("PATH") {
            dirs.extend(env::split_paths(&inherited));
        }
        env::join_paths(dirs).ok()
    }

    fn command(&self, spec: &CommandSpec) -> Command {
        let search = self.search_path();
        let mut vars = spec.env.clone();
        let mut program = OsString::from(&spec.program);
        if let Some(path) = &search {
            vars.push(("PATH".to_string(), path.to_string_lossy().into_owned()));
            if let Some(found) = self.locate(&spec.program) {
                program = found.into_os_string();
            }
        }

        let mut cmd = if spec.elevated && !self.privileged {
            // sudo resets the environment, so pass variables through env(1)
            let mut sudo = Command::new("sudo");
            if !vars.is_empty() {
                sudo.arg("env");
                sudo.args(vars.iter().map(|(k, v)| format!("{k}={v}")));
            }
            sudo.arg(&program);
            sudo
        } else {
            let mut direct = Command::new(&program);
            direct.envs(vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            direct
        };
        cmd.args(&spec.args);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    fn limit(&self, spec: &CommandSpec) -> Duration {
        spec.timeout.unwrap_or(self.default_timeout)
    }
}

fn spawn_error(spec: &CommandSpec, err: std::io::Error) -> anyhow::Error {
    if err.kind() == ErrorKind::NotFound {
        ProvisionError::ToolMissing {
            program: spec.program.clone(),
        }
        .into()
    } else {
        anyhow::Error::new(err).context(format!("Failed to execute `{}`", spec.display()))
    }
}

impl CommandRunner for SystemRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        match self.search_path() {
            Some(path) => {
                let cwd = env::current_dir().ok()?;
                which::which_in(program, Some(path), cwd).ok()
            }
            None => which::which(program).ok(),
        }
    }

    fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn prepend_path(&self, dir: PathBuf) {
        if let Ok(mut dirs) = self.extra_paths.write() {
            if !dirs.contains(&dir) {
                debug!("searching {} ahead of PATH", dir.display());
                dirs.insert(0, dir);
            }
        }
    }

    async fn run(&self, spec: &CommandSpec) -> Result<()> {
        let limit = self.limit(spec);
        debug!("running `{}` (timeout {}s)", spec.display(), limit.as_secs());

        let mut child = self
            .command(spec)
            .spawn()
            .map_err(|e| spawn_error(spec, e))?;

        let status = match timeout(limit, child.wait()).await {
            Ok(waited) => {
                waited.with_context(|| format!("Failed waiting for `{}`", spec.display()))?
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(ProvisionError::CommandTimedOut {
                    command: spec.display(),
                    timeout: limit,
                }
                .into());
            }
        };

        if !status.success() {
            return Err(ProvisionError::CommandFailed {
                command: spec.display(),
                status: status.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let limit = self.limit(spec);
        let mut cmd = self.command(spec);
        cmd.stdin(Stdio::null());

        let output = match timeout(limit, cmd.output()).await {
            Ok(result) => result.map_err(|e| spawn_error(spec, e))?,
            Err(_) => {
                return Err(ProvisionError::CommandTimedOut {
                    command: spec.display(),
                    timeout: limit,
                }
                .into());
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
