//! Environment probing
//!
//! Builds a [`HostProfile`] once at the start of a run: OS family first, then
//! every tool the workflow may need. Probing is read-only; the only commands
//! executed are `uname -s` and `<tool> --version`.

mod os;
mod tools;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::Serialize;

pub use os::OsFamily;
pub use tools::{Tool, ToolStatus, Version};

use crate::process::{CommandRunner, CommandSpec};

/// Snapshot of the host taken before any installation
#[derive(Debug, Clone, Serialize)]
pub struct HostProfile {
    pub os: OsFamily,
    pub tools: BTreeMap<Tool, ToolStatus>,
    /// `nvm.sh` when a user-space Node version manager is installed
    pub version_manager: Option<PathBuf>,
}

impl HostProfile {
    pub fn tool(&self, tool: Tool) -> Option<&ToolStatus> {
        self.tools.get(&tool)
    }

    pub fn has(&self, tool: Tool) -> bool {
        self.tools.contains_key(&tool)
    }
}

pub struct Prober {
    root: PathBuf,
    nvm_dir: Option<PathBuf>,
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Self {
        let nvm_dir = std::env::var_os("NVM_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".nvm")));
        Self {
            root: PathBuf::from("/"),
            nvm_dir,
            timeout,
        }
    }

    /// Look for OS marker files below `root` instead of `/`
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    pub fn with_nvm_dir(mut self, nvm_dir: Option<PathBuf>) -> Self {
        self.nvm_dir = nvm_dir;
        self
    }

    pub async fn probe<R: CommandRunner>(&self, runner: &R) -> HostProfile {
        let os = self.detect_os(runner).await;
        if !os.is_known() {
            debug!("no OS family matched; OS-specific install recipes are disabled");
        }
        let tools = self.probe_tools(&Tool::ALL, runner).await;
        let version_manager = self
            .nvm_dir
            .as_ref()
            .map(|dir| dir.join("nvm.sh"))
            .filter(|script| script.exists());

        HostProfile {
            os,
            tools,
            version_manager,
        }
    }

    pub async fn detect_os<R: CommandRunner>(&self, runner: &R) -> OsFamily {
        let kernel = match runner.output(&self.query("uname", "-s")).await {
            Ok(out) if out.success => out.stdout.trim().to_string(),
            _ => {
                if cfg!(target_os = "macos") {
                    "Darwin".to_string()
                } else {
                    std::env::consts::OS.to_string()
                }
            }
        };
        OsFamily::classify(&kernel, &self.root)
    }

    pub async fn probe_tools<R: CommandRunner>(
        &self,
        tools: &[Tool],
        runner: &R,
    ) -> BTreeMap<Tool, ToolStatus> {
        let mut found = BTreeMap::new();
        for &tool in tools {
            if let Some(status) = self.probe_tool(tool, runner).await {
                found.insert(tool, status);
            }
        }
        found
    }

    /// `None` when the tool is not on the search path
    pub async fn probe_tool<R: CommandRunner>(&self, tool: Tool, runner: &R) -> Option<ToolStatus> {
        let path = runner.locate(tool.program())?;
        let version = match runner
            .output(&self.query(tool.program(), tool.version_arg()))
            .await
        {
            Ok(out) => Version::parse(&out.stdout).or_else(|| Version::parse(&out.stderr)),
            Err(e) => {
                debug!("version query for {tool} failed: {e:#}");
                None
            }
        };
        debug!("found {tool} at {} ({version:?})", path.display());
        Some(ToolStatus { path, version })
    }

    fn query(&self, program: &str, arg: &str) -> CommandSpec {
        CommandSpec::new(program).arg(arg).timeout(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::FakeRunner;

    #[tokio::test]
    async fn probe_collects_os_and_tool_versions() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("etc")).unwrap();
        std::fs::write(root.path().join("etc/debian_version"), "12.4").unwrap();

        let runner = FakeRunner::new()
            .tool("node", "v20.11.1")
            .tool("npm", "10.2.4")
            .tool("curl", "curl 8.5.0 (x86_64-pc-linux-gnu)");
        let profile = Prober::new(Duration::from_secs(5))
            .with_root(root.path())
            .with_nvm_dir(None)
            .probe(&runner)
            .await;

        assert_eq!(profile.os, OsFamily::Debian);
        assert_eq!(profile.tool(Tool::Node).unwrap().version.unwrap().major, 20);
        assert!(profile.has(Tool::Curl));
        assert!(!profile.has(Tool::Mongod));
        assert!(profile.version_manager.is_none());
        assert!(runner.ran().is_empty(), "probing must not run installers");
    }

    #[tokio::test]
    async fn unknown_os_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        let nvm = tempfile::tempdir().unwrap();
        std::fs::write(nvm.path().join("nvm.sh"), "# nvm").unwrap();

        let runner = FakeRunner::new().kernel("FreeBSD");
        let profile = Prober::new(Duration::from_secs(5))
            .with_root(root.path())
            .with_nvm_dir(Some(nvm.path().to_path_buf()))
            .probe(&runner)
            .await;

        assert_eq!(profile.os, OsFamily::Unknown);
        assert!(profile.tools.is_empty());
        assert_eq!(profile.version_manager, Some(nvm.path().join("nvm.sh")));
    }
}
