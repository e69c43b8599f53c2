//! Provisioning orchestrator for the qid-oauth application stack
//!
//! Prepares a host (Node.js, npm, MongoDB, unzip, curl/wget), fetches the
//! application bundle, writes its runtime configuration, builds it and
//! optionally runs it under PM2. [`workflow::Provisioner`] drives the
//! stages; the binary in `main.rs` wires it to the terminal.

pub mod build;
pub mod bundle;
pub mod cli;
pub mod config;
pub mod console;
pub mod dependencies;
pub mod detection;
pub mod error;
pub mod process;
pub mod prompt;
pub mod report;
pub mod runners;
pub mod runtime_config;
pub mod supervisor;
pub mod workflow;

pub use config::ProvisionConfig;
pub use error::ProvisionError;
pub use workflow::{InstallOptions, ProvisionOutcome, Provisioner};
