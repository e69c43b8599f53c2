//! Archive download through whichever download tool is present

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::console;
use crate::error::ProvisionError;
use crate::process::{CommandRunner, CommandSpec};

/// Command that downloads `url` to `dest`, preferring curl over wget
pub fn download_command<R: CommandRunner>(runner: &R, url: &str, dest: &Path) -> Result<CommandSpec> {
    let dest = dest.display().to_string();
    if runner.locate("curl").is_some() {
        Ok(CommandSpec::new("curl").args(["-fsSL", "-o", dest.as_str(), url]))
    } else if runner.locate("wget").is_some() {
        Ok(CommandSpec::new("wget").args(["-q", "-O", dest.as_str(), url]))
    } else {
        Err(ProvisionError::ToolMissing {
            program: "curl or wget".to_string(),
        }
        .into())
    }
}

pub(super) async fn download<R: CommandRunner>(
    url: &str,
    dest: &Path,
    runner: &R,
    timeout: Duration,
) -> Result<()> {
    let command = download_command(runner, url, dest)?.timeout(timeout);

    let spinner = console::spinner(format!("Downloading {url}"));
    let result = runner.run(&command).await;
    spinner.finish_and_clear();

    result.with_context(|| format!("Failed to download bundle from {url}"))
}
