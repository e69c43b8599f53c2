use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const SOURCE_URL_ENV: &str = "QID_PROVISION_SOURCE_URL";
pub const COMMAND_TIMEOUT_ENV: &str = "QID_PROVISION_COMMAND_TIMEOUT";

/// Top‑level provisioning configuration (defaults match the stock install).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub app_name: String,
    pub bundle_version: String,
    /// Bundle archive location; `{version}` is replaced by `bundle_version`
    pub source_url: String,
    pub install_dir: PathBuf,
    pub database_uri: String,
    pub port: u16,
    /// PM2 process name
    pub service_name: String,
    /// Script PM2 starts, relative to the install directory
    pub entry_point: String,
    pub requirements: RequirementConfig,
    pub build: BuildConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementConfig {
    pub runtime_major: u64,
    pub package_manager_major: u64,
    pub database_major: u64,
}

/// Collaborator build commands, run from the install directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub backend: Vec<String>,
    pub frontend: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Version queries and other read-only probes
    pub probe_secs: u64,
    /// Installers, downloads and build steps
    pub command_secs: u64,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            app_name: "qid-oauth".into(),
            bundle_version: "1.0.0".into(),
            source_url: "https://github.com/qid-oauth/qid-oauth/archive/refs/tags/v{version}.zip"
                .into(),
            install_dir: PathBuf::from("./qid-oauth"),
            database_uri: "mongodb://localhost:27017/qid-oauth-prod".into(),
            port: 5000,
            service_name: "qid-oauth".into(),
            entry_point: "server.js".into(),
            requirements: RequirementConfig::default(),
            build: BuildConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Default for RequirementConfig {
    fn default() -> Self {
        Self {
            runtime_major: 18,
            package_manager_major: 8,
            database_major: 7,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            backend: vec!["npm".into(), "install".into()],
            frontend: vec!["npm".into(), "run".into(), "build".into()],
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 30,
            command_secs: 1800,
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }
}

impl ProvisionConfig {
    /// Load from `path` when given, else defaults; environment overrides apply either way
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str::<Self>(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(SOURCE_URL_ENV) {
            self.source_url = url;
        }
        if let Some(secs) = lookup(COMMAND_TIMEOUT_ENV).and_then(|s| s.trim().parse::<u64>().ok()) {
            self.timeouts.command_secs = secs;
        }
    }

    /// Source URL with the bundle version substituted
    pub fn resolved_source_url(&self) -> String {
        self.source_url.replace("{version}", &self.bundle_version)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
