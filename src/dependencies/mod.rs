//! Required tools and how to satisfy them
//!
//! - `requirement` - minimum versions and the pure satisfaction check
//! - `strategy` - (dependency, OS family) lookup table of install recipes
//! - `installer` - `ensure`: check, ask, install, re-verify

mod installer;
mod requirement;
mod strategy;

use serde::Serialize;

pub use installer::{EnsureOutcome, ensure};
pub use requirement::{DependencyRequirement, Threshold, Verdict, requirements_from};
pub use strategy::{Strategy, StrategyContext, select};

use crate::detection::Tool;

/// A required piece of the application stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    DownloadTool,
    ArchiveTool,
    Runtime,
    PackageManager,
    Database,
    Supervisor,
}

impl Dependency {
    /// Tools that can satisfy this dependency (any one suffices)
    pub fn tools(self) -> &'static [Tool] {
        match self {
            Dependency::DownloadTool => &[Tool::Curl, Tool::Wget],
            Dependency::ArchiveTool => &[Tool::Unzip],
            Dependency::Runtime => &[Tool::Node],
            Dependency::PackageManager => &[Tool::Npm],
            Dependency::Database => &[Tool::Mongod],
            Dependency::Supervisor => &[Tool::Pm2],
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dependency::DownloadTool => "curl or wget",
            Dependency::ArchiveTool => "unzip",
            Dependency::Runtime => "Node.js",
            Dependency::PackageManager => "npm",
            Dependency::Database => "MongoDB",
            Dependency::Supervisor => "PM2",
        };
        f.write_str(name)
    }
}
