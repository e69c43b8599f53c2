use std::path::PathBuf;

use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Provision a host for the qid-oauth application stack")]
pub struct Args {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG also works
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Sub‑commands (install, probe, config)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Check dependencies, fetch the bundle, configure, build and start (default)
    Install(InstallArgs),
    /// Report OS family, tool versions and dependency status; changes nothing
    Probe {
        /// Path to configuration file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Print the host profile as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration as TOML
    Config {
        /// Destination file (stdout when omitted)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Path to configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Bundle archive URL (overrides config and QID_PROVISION_SOURCE_URL)
    #[arg(long)]
    pub source_url: Option<String>,

    /// Install directory; skips the directory prompt
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Non-interactive: accept the stated default for every prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Remove the install directory on abort if this run created it
    #[arg(long)]
    pub cleanup_on_failure: bool,
}
