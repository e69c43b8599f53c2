//! External command execution
//!
//! Every collaborator the provisioner drives (package managers, installers,
//! curl/wget, unzip, npm, pm2) is reached through [`CommandRunner`]. The live
//! implementation is [`SystemRunner`]; tests substitute a scripted fake.

mod system;

#[cfg(test)]
pub(crate) mod fake;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

pub use system::SystemRunner;

/// One external command, described before it is executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Needs root; the runner prefixes `sudo` when we are not already root
    pub elevated: bool,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            elevated: false,
            timeout: None,
        }
    }

    /// `sh -c <script>` for steps that need pipes or redirection
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Build from an argv list such as `["npm", "install"]`
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.clone()).args(rest.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Human-readable command line (without any `sudo` prefix)
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a command run for its output
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between provisioning decisions and the host
///
/// `run` inherits the terminal (installers may ask for a sudo password) and
/// fails on a non-zero exit. `output` captures stdout/stderr and leaves the
/// exit status for the caller to interpret.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Resolve a program on the search path
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Whether elevated commands can run without `sudo`
    fn is_privileged(&self) -> bool;

    /// Search `dir` before the inherited PATH, for `locate` and for every
    /// command spawned afterwards
    fn prepend_path(&self, dir: PathBuf);

    async fn run(&self, spec: &CommandSpec) -> Result<()>;

    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}
