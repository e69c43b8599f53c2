//! Runtime configuration for the provisioned application
//!
//! Two artifacts are written into the install directory:
//! `config/production.json` (connection string and secrets) and `.env`
//! (`NODE_ENV` and `PORT`). Both are overwritten on every run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::console;
use crate::error::ProvisionError;
use crate::prompt::{Prompter, Question};

pub const SETTINGS_FILE: &str = "config/production.json";
pub const ENV_FILE: &str = ".env";
pub const ENVIRONMENT_MODE: &str = "production";

const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub database_uri: String,
    pub jwt_secret: String,
    pub oauth_secret: String,
    pub port: u16,
    pub environment: &'static str,
}

/// On-disk shape of `config/production.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(rename = "mongoURI")]
    pub mongo_uri: String,
    #[serde(rename = "jwtSecret")]
    pub jwt_secret: String,
    #[serde(rename = "oauthTokenSecret")]
    pub oauth_token_secret: String,
}

/// Paths written by [`collect`]
#[derive(Debug, Clone)]
pub struct WrittenConfig {
    pub config: RuntimeConfig,
    pub settings_path: PathBuf,
    pub env_path: PathBuf,
}

/// 256 random bits, hex encoded
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn parse_port(value: &str) -> Result<u16, ProvisionError> {
    let trimmed = value.trim();
    match trimmed.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ProvisionError::InvalidPort {
            value: trimmed.to_string(),
        }),
    }
}

pub fn write_settings(install_dir: &Path, config: &RuntimeConfig) -> Result<PathBuf> {
    let path = install_dir.join(SETTINGS_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let settings = SettingsFile {
        mongo_uri: config.database_uri.clone(),
        jwt_secret: config.jwt_secret.clone(),
        oauth_token_secret: config.oauth_secret.clone(),
    };
    let json = serde_json::to_string_pretty(&settings)?;
    fs::write(&path, json + "\n").with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn write_env_file(install_dir: &Path, environment: &str, port: u16) -> Result<PathBuf> {
    let path = install_dir.join(ENV_FILE);
    fs::write(&path, format!("NODE_ENV={environment}\nPORT={port}\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Replace the value of the existing `PORT=` line in place
pub fn override_port(env_path: &Path, port: u16) -> Result<()> {
    let text = fs::read_to_string(env_path)
        .with_context(|| format!("Failed to read {}", env_path.display()))?;

    let mut replaced = false;
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            if line.starts_with("PORT=") {
                replaced = true;
                format!("PORT={port}")
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        bail!("{} has no PORT line to override", env_path.display());
    }

    fs::write(env_path, lines.join("\n") + "\n")
        .with_context(|| format!("Failed to write {}", env_path.display()))
}

/// Port as persisted in the environment file
pub fn read_port(env_path: &Path) -> Result<u16> {
    let text = fs::read_to_string(env_path)
        .with_context(|| format!("Failed to read {}", env_path.display()))?;
    let value = text
        .lines()
        .find_map(|line| line.strip_prefix("PORT="))
        .with_context(|| format!("{} has no PORT line", env_path.display()))?;
    Ok(parse_port(value)?)
}

/// Ask for (or generate) every value, then write both artifacts
///
/// The default `PORT` line is written before the customisation prompt so
/// an override is always a substitution on an existing line.
pub fn collect<P: Prompter>(
    install_dir: &Path,
    default_database_uri: &str,
    default_port: u16,
    prompter: &mut P,
) -> Result<WrittenConfig> {
    let database_uri = match prompter.input(Question::DatabaseUri, default_database_uri)?.trim() {
        "" => default_database_uri.to_string(),
        uri => uri.to_string(),
    };
    let jwt_secret = secret_or_generated(prompter, Question::JwtSecret)?;
    let oauth_secret = secret_or_generated(prompter, Question::OauthSecret)?;

    let mut config = RuntimeConfig {
        database_uri,
        jwt_secret,
        oauth_secret,
        port: default_port,
        environment: ENVIRONMENT_MODE,
    };

    let settings_path = write_settings(install_dir, &config)?;
    console::success(format!("Wrote {}", settings_path.display()));
    let env_path = write_env_file(install_dir, config.environment, config.port)?;

    let customize = Question::CustomizePort;
    if prompter.confirm(customize, customize.default_confirm())? {
        let answer = prompter.input(Question::PortNumber, &default_port.to_string())?;
        config.port = parse_port(&answer)?;
        override_port(&env_path, config.port)?;
        info!("port overridden to {}", config.port);
    }
    console::success(format!("Wrote {} (PORT={})", env_path.display(), config.port));

    Ok(WrittenConfig {
        config,
        settings_path,
        env_path,
    })
}

fn secret_or_generated<P: Prompter>(prompter: &mut P, question: Question) -> Result<String> {
    let supplied = prompter.input(question, "")?;
    Ok(match supplied.trim() {
        "" => generate_secret(),
        value => value.to_string(),
    })
}
