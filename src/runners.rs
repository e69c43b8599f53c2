//! Top-level runners behind each subcommand

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use termcolor::Color;

use crate::cli::InstallArgs;
use crate::config::ProvisionConfig;
use crate::console;
use crate::dependencies::requirements_from;
use crate::detection::Prober;
use crate::process::SystemRunner;
use crate::prompt::{DefaultsPrompter, InquirePrompter};
use crate::workflow::{InstallOptions, Provisioner};

/// Run the full provisioning workflow
pub async fn run_install(args: &InstallArgs) -> Result<()> {
    let mut config = ProvisionConfig::load(args.config.as_deref())?;
    if let Some(url) = &args.source_url {
        config.source_url = url.clone();
    }

    console::show_welcome(&config.app_name);

    let runner = SystemRunner::new(config.timeouts.command());
    let options = InstallOptions {
        install_dir: args.install_dir.clone(),
        cleanup_on_failure: args.cleanup_on_failure,
    };

    let outcome = if args.yes {
        console::info("Non-interactive mode: every prompt takes its default");
        Provisioner::new(config, options, runner, DefaultsPrompter)
            .run()
            .await?
    } else {
        Provisioner::new(config, options, runner, InquirePrompter)
            .run()
            .await?
    };

    for (dependency, recipe) in &outcome.installed {
        log::info!("installed {dependency} via {recipe}");
    }
    Ok(())
}

/// Print the host profile and whether each requirement holds
pub async fn run_probe(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = ProvisionConfig::load(config_path)?;
    let runner = SystemRunner::new(config.timeouts.probe());
    let profile = Prober::new(config.timeouts.probe()).probe(&runner).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    console::heading(&format!("Host: {}", profile.os), Some(Color::Cyan));
    for (tool, status) in &profile.tools {
        let version = status
            .version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "version unknown".to_string());
        console::line(format!("  {tool:<7} {version:<16} {}", status.path.display()));
    }
    if let Some(nvm) = &profile.version_manager {
        console::line(format!("  nvm     {}", nvm.display()));
    }

    console::line("");
    for requirement in requirements_from(&config.requirements) {
        let verdict = requirement.evaluate_profile(&profile);
        let message = format!("{}: {}", requirement.dependency, verdict.describe());
        if verdict.is_satisfied() {
            console::success(message);
        } else {
            console::warning(message);
        }
    }
    Ok(())
}

/// Write the default configuration to `output`, or stdout
pub fn write_default_config(output: Option<&Path>) -> Result<()> {
    let text = ProvisionConfig::default().to_toml_string()?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            console::success(format!("Wrote default configuration to {}", path.display()));
        }
        None => print!("{text}"),
    }
    Ok(())
}
