//! Fatal conditions that abort a provisioning run
//!
//! Every variant is terminal: the workflow never retries or rolls back.
//! Stages raise these through `anyhow` so callers can attach context while
//! tests can still `downcast_ref::<ProvisionError>()`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::dependencies::Dependency;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Operator refused to let us install a required tool
    #[error("{dependency} is required but installation was declined")]
    DependencyDeclined { dependency: Dependency },

    /// Tool still missing or too old after running its install strategy
    #[error("{dependency} is still not satisfied after installation: {detail}")]
    DependencyUnsatisfied {
        dependency: Dependency,
        detail: String,
    },

    #[error("no automatic install strategy for {dependency} on {os}; install it manually")]
    NoInstallStrategy { dependency: Dependency, os: String },

    #[error("{what} must not be empty")]
    EmptyValue { what: &'static str },

    #[error("invalid port {value:?}: expected an integer between 1 and 65535")]
    InvalidPort { value: String },

    #[error("required tool `{program}` was not found on PATH")]
    ToolMissing { program: String },

    #[error("`{command}` failed with {status}")]
    CommandFailed { command: String, status: String },

    #[error("`{command}` timed out after {} seconds", timeout.as_secs())]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("archive {archive} did not contain a top-level directory")]
    MalformedArchive { archive: PathBuf },

    #[error("install directory {path} is missing or empty")]
    EmptyInstallDir { path: PathBuf },

    #[error("prompt cancelled: {0}")]
    PromptCancelled(String),
}

impl ProvisionError {
    /// Coarse classification used when reporting the abort
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DependencyDeclined { .. }
            | Self::DependencyUnsatisfied { .. }
            | Self::NoInstallStrategy { .. } => ErrorCategory::Environment,
            Self::EmptyValue { .. } | Self::InvalidPort { .. } | Self::PromptCancelled(_) => {
                ErrorCategory::Input
            }
            Self::ToolMissing { .. } | Self::CommandFailed { .. } | Self::CommandTimedOut { .. } => {
                ErrorCategory::ExternalTool
            }
            Self::MalformedArchive { .. } | Self::EmptyInstallDir { .. } => {
                ErrorCategory::Structural
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Environment,
    Input,
    ExternalTool,
    Structural,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Environment => "environment error",
            Self::Input => "input error",
            Self::ExternalTool => "external tool failure",
            Self::Structural => "structural error",
        };
        f.write_str(label)
    }
}

/// Pull the typed error back out of an `anyhow` chain, if there is one
pub fn classify(err: &anyhow::Error) -> Option<&ProvisionError> {
    err.chain().find_map(|cause| cause.downcast_ref::<ProvisionError>())
}
