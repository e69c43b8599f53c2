//! Scripted runner for tests: simulated tools, installs and archives

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;

use super::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::ProvisionError;

#[derive(Default)]
struct FakeState {
    kernel: String,
    /// program -> output of its version query
    tools: BTreeMap<String, String>,
    /// (command substring, program it provides, version output)
    installs: Vec<(String, String, String)>,
    failing: Vec<String>,
    archive_tree: Vec<String>,
    registered: Vec<String>,
    /// (command substring, file written, contents)
    creates: Vec<(String, PathBuf, String)>,
    /// (command substring, stdout returned by `output`)
    responses: Vec<(String, String)>,
    extra_paths: Vec<PathBuf>,
    ran: Vec<String>,
}

pub(crate) struct FakeRunner {
    state: Mutex<FakeState>,
    privileged: bool,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                kernel: "Linux".to_string(),
                ..FakeState::default()
            }),
            privileged: true,
        }
    }

    pub(crate) fn kernel(self, kernel: &str) -> Self {
        self.state.lock().unwrap().kernel = kernel.to_string();
        self
    }

    pub(crate) fn tool(self, program: &str, version_output: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .tools
            .insert(program.to_string(), version_output.to_string());
        self
    }

    /// Any `run` whose command line contains `pattern` makes `program` appear
    pub(crate) fn installs(self, pattern: &str, program: &str, version_output: &str) -> Self {
        self.state.lock().unwrap().installs.push((
            pattern.to_string(),
            program.to_string(),
            version_output.to_string(),
        ));
        self
    }

    /// Any `run` whose command line contains `pattern` writes `contents` to `path`
    pub(crate) fn creates(self, pattern: &str, path: &Path, contents: &str) -> Self {
        self.state.lock().unwrap().creates.push((
            pattern.to_string(),
            path.to_path_buf(),
            contents.to_string(),
        ));
        self
    }

    pub(crate) fn responds(self, pattern: &str, stdout: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push((pattern.to_string(), stdout.to_string()));
        self
    }

    pub(crate) fn fails(self, pattern: &str) -> Self {
        self.state.lock().unwrap().failing.push(pattern.to_string());
        self
    }

    /// Entries created by `unzip ... -d <dir>`; a trailing `/` marks a directory
    pub(crate) fn archive(self, entries: &[&str]) -> Self {
        self.state.lock().unwrap().archive_tree = entries.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Every command line passed to `run`, in order
    pub(crate) fn ran(&self) -> Vec<String> {
        self.state.lock().unwrap().ran.clone()
    }

    pub(crate) fn ran_matching(&self, pattern: &str) -> usize {
        self.ran().iter().filter(|line| line.contains(pattern)).count()
    }
}

fn arg_after<'a>(spec: &'a CommandSpec, flag: &str) -> Option<&'a str> {
    spec.args
        .iter()
        .position(|a| a == flag)
        .and_then(|i| spec.args.get(i + 1))
        .map(String::as_str)
}

fn materialize(root: &Path, entries: &[String]) -> std::io::Result<()> {
    for entry in entries {
        let path = root.join(entry.trim_end_matches('/'));
        if entry.ends_with('/') {
            std::fs::create_dir_all(&path)?;
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, entry.as_bytes())?;
        }
    }
    Ok(())
}

fn on_extra_path(state: &FakeState, program: &str) -> Option<PathBuf> {
    state
        .extra_paths
        .iter()
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}

fn ok_output(stdout: String) -> CommandOutput {
    CommandOutput {
        success: true,
        status: "exit status: 0".into(),
        stdout,
        stderr: String::new(),
    }
}

impl CommandRunner for FakeRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let state = self.state.lock().unwrap();
        on_extra_path(&state, program).or_else(|| {
            state
                .tools
                .contains_key(program)
                .then(|| PathBuf::from("/usr/bin").join(program))
        })
    }

    fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn prepend_path(&self, dir: PathBuf) {
        let mut state = self.state.lock().unwrap();
        if !state.extra_paths.contains(&dir) {
            state.extra_paths.insert(0, dir);
        }
    }

    async fn run(&self, spec: &CommandSpec) -> Result<()> {
        let line = spec.display();
        let mut state = self.state.lock().unwrap();
        state.ran.push(line.clone());

        if state.failing.iter().any(|p| line.contains(p.as_str())) {
            return Err(ProvisionError::CommandFailed {
                command: line,
                status: "exit status: 1".to_string(),
            }
            .into());
        }

        let provided: Vec<(String, String)> = state
            .installs
            .iter()
            .filter(|(pattern, _, _)| line.contains(pattern.as_str()))
            .map(|(_, program, version)| (program.clone(), version.clone()))
            .collect();
        state.tools.extend(provided);

        for (pattern, path, contents) in &state.creates {
            if line.contains(pattern.as_str()) {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, contents)?;
            }
        }

        match spec.program.as_str() {
            "curl" | "wget" => {
                let flag = if spec.program == "curl" { "-o" } else { "-O" };
                if let Some(dest) = arg_after(spec, flag) {
                    std::fs::write(dest, b"PK\x03\x04")?;
                }
            }
            "unzip" => {
                if let Some(dest) = arg_after(spec, "-d") {
                    std::fs::create_dir_all(dest)?;
                    materialize(Path::new(dest), &state.archive_tree)?;
                }
            }
            "pm2" if spec.args.first().map(String::as_str) == Some("start") => {
                if let Some(name) = arg_after(spec, "--name") {
                    state.registered.push(name.to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let state = self.state.lock().unwrap();
        let line = spec.display();
        if let Some((_, stdout)) = state
            .responses
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
        {
            return Ok(ok_output(stdout.clone()));
        }
        if spec.program == "uname" {
            return Ok(ok_output(format!("{}\n", state.kernel)));
        }
        if spec.program == "pm2" && spec.args.first().map(String::as_str) == Some("describe") {
            let known = spec
                .args
                .get(1)
                .is_some_and(|name| state.registered.contains(name));
            return Ok(CommandOutput {
                success: known,
                status: if known { "exit status: 0" } else { "exit status: 1" }.into(),
                ..CommandOutput::default()
            });
        }
        // a file on an extra path answers its version query with its contents
        if let Some(path) = on_extra_path(&state, &spec.program) {
            let version = std::fs::read_to_string(path)?;
            return Ok(ok_output(format!("{}\n", version.trim())));
        }
        match state.tools.get(&spec.program) {
            Some(version) => Ok(ok_output(format!("{version}\n"))),
            None => Err(ProvisionError::ToolMissing {
                program: spec.program.clone(),
            }
            .into()),
        }
    }
}
