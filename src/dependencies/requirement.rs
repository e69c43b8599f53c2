use serde::Serialize;

use super::Dependency;
use crate::config::RequirementConfig;
use crate::detection::{HostProfile, Tool, ToolStatus, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Threshold {
    /// Found at all, any version
    Present,
    /// Detected major version must be at least this
    MinMajor(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DependencyRequirement {
    pub dependency: Dependency,
    pub threshold: Threshold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Satisfied { by: Tool, version: Option<Version> },
    Missing,
    Outdated { found: Option<Version>, required: u64 },
}

impl Verdict {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verdict::Satisfied { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Verdict::Satisfied { by, version: Some(v) } => format!("{by} {v}"),
            Verdict::Satisfied { by, version: None } => format!("{by} (version unknown)"),
            Verdict::Missing => "not found".to_string(),
            Verdict::Outdated { found: Some(v), required } => {
                format!("found {v}, need {required}.x or newer")
            }
            Verdict::Outdated { found: None, required } => {
                format!("version could not be determined, need {required}.x or newer")
            }
        }
    }
}

impl DependencyRequirement {
    pub fn new(dependency: Dependency, threshold: Threshold) -> Self {
        Self {
            dependency,
            threshold,
        }
    }

    /// Pure check against whatever tools are known
    ///
    /// Multi-tool dependencies (curl/wget) are satisfied by the first
    /// candidate that meets the threshold.
    pub fn evaluate<'a>(&self, lookup: impl Fn(Tool) -> Option<&'a ToolStatus>) -> Verdict {
        let mut best = Verdict::Missing;
        for &tool in self.dependency.tools() {
            let Some(status) = lookup(tool) else {
                continue;
            };
            match self.threshold {
                Threshold::Present => {
                    return Verdict::Satisfied {
                        by: tool,
                        version: status.version,
                    };
                }
                Threshold::MinMajor(required) => match status.version {
                    Some(v) if v.major >= required => {
                        return Verdict::Satisfied {
                            by: tool,
                            version: Some(v),
                        };
                    }
                    found => {
                        best = Verdict::Outdated { found, required };
                    }
                },
            }
        }
        best
    }

    pub fn evaluate_profile(&self, profile: &HostProfile) -> Verdict {
        self.evaluate(|tool| profile.tool(tool))
    }
}

/// Requirements in the order they are ensured
///
/// The download tool comes first because the Linux runtime and database
/// recipes fetch their repository setup scripts with curl.
pub fn requirements_from(config: &RequirementConfig) -> Vec<DependencyRequirement> {
    vec![
        DependencyRequirement::new(Dependency::DownloadTool, Threshold::Present),
        DependencyRequirement::new(Dependency::ArchiveTool, Threshold::Present),
        DependencyRequirement::new(
            Dependency::Runtime,
            Threshold::MinMajor(config.runtime_major),
        ),
        DependencyRequirement::new(
            Dependency::PackageManager,
            Threshold::MinMajor(config.package_manager_major),
        ),
        DependencyRequirement::new(
            Dependency::Database,
            Threshold::MinMajor(config.database_major),
        ),
    ]
}
