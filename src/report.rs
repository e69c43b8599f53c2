//! Completion summary
//!
//! Reads the port back from the persisted `.env` rather than trusting the
//! in-memory value, so the report shows what the application will see.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use termcolor::Color;

use crate::console;
use crate::runtime_config::{ENV_FILE, read_port};
use crate::supervisor::SupervisorChoice;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub install_dir: PathBuf,
    pub port: u16,
    pub url: String,
    pub supervised: bool,
    pub commands: Vec<String>,
}

impl CompletionReport {
    pub fn gather(install_dir: &Path, choice: SupervisorChoice, service_name: &str) -> Result<Self> {
        let port = read_port(&install_dir.join(ENV_FILE))?;
        Ok(Self {
            install_dir: install_dir.to_path_buf(),
            port,
            url: format!("http://localhost:{port}"),
            supervised: choice.enabled,
            commands: management_commands(choice, service_name, install_dir),
        })
    }

    pub fn print(&self) {
        println!();
        console::rule();
        console::heading("Installation complete", Some(Color::Green));
        console::rule();
        console::line(format!("  Install directory: {}", self.install_dir.display()));
        console::line(format!("  Application URL:   {}", self.url));
        console::line("");
        if self.supervised {
            console::line("Manage the application with PM2:");
        } else {
            console::line("Start the application manually:");
        }
        for command in &self.commands {
            console::line(format!("  {command}"));
        }
        println!();
    }
}

pub fn management_commands(
    choice: SupervisorChoice,
    service_name: &str,
    install_dir: &Path,
) -> Vec<String> {
    if choice.enabled {
        let mut commands = vec!["pm2 status".to_string()];
        commands.extend(
            ["logs", "restart", "stop"]
                .iter()
                .map(|action| format!("pm2 {action} {service_name}")),
        );
        commands
    } else {
        vec![format!("cd {} && npm start", install_dir.display())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn manual_start_when_supervisor_declined() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(ENV_FILE), "NODE_ENV=production\nPORT=5000\n").unwrap();

        let report =
            CompletionReport::gather(dir.path(), SupervisorChoice::default(), "qid-oauth").unwrap();

        assert_eq!(report.url, "http://localhost:5000");
        assert!(!report.supervised);
        assert_eq!(report.commands.len(), 1);
        assert!(report.commands[0].ends_with("npm start"));
        assert!(report.commands.iter().all(|c| !c.contains("pm2")));
    }

    #[test]
    fn supervised_report_lists_pm2_commands() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(ENV_FILE), "PORT=8080\nNODE_ENV=production\n").unwrap();
        let choice = SupervisorChoice {
            enabled: true,
            auto_start_on_boot: false,
        };

        let report = CompletionReport::gather(dir.path(), choice, "qid-oauth").unwrap();

        assert_eq!(report.port, 8080);
        assert_eq!(
            report.commands,
            vec![
                "pm2 status",
                "pm2 logs qid-oauth",
                "pm2 restart qid-oauth",
                "pm2 stop qid-oauth",
            ]
        );
    }

    #[test]
    fn missing_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CompletionReport::gather(dir.path(), SupervisorChoice::default(), "x").is_err());
    }
}
