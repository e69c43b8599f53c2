//! Tools the provisioner probes for, and their version strings

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("version pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Node,
    Npm,
    Mongod,
    Unzip,
    Curl,
    Wget,
    Pm2,
}

impl Tool {
    pub const ALL: [Tool; 7] = [
        Tool::Node,
        Tool::Npm,
        Tool::Mongod,
        Tool::Unzip,
        Tool::Curl,
        Tool::Wget,
        Tool::Pm2,
    ];

    /// Executable name on the search path
    pub fn program(self) -> &'static str {
        match self {
            Tool::Node => "node",
            Tool::Npm => "npm",
            Tool::Mongod => "mongod",
            Tool::Unzip => "unzip",
            Tool::Curl => "curl",
            Tool::Wget => "wget",
            Tool::Pm2 => "pm2",
        }
    }

    /// Argument that makes the tool print its version
    pub fn version_arg(self) -> &'static str {
        match self {
            Tool::Unzip => "-v",
            _ => "--version",
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.program())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// First `major.minor[.patch]` group in arbitrary tool output
    ///
    /// Handles `v18.19.0`, `db version v7.0.4`, `UnZip 6.00 of ...`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(text)?;
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
        Some(Self {
            major: num(1)?,
            minor: num(2)?,
            patch: num(3).unwrap_or(0),
        })
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A tool found on the search path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub path: PathBuf,
    pub version: Option<Version>,
}
