//! Interactive decision points
//!
//! Stages ask [`Question`]s through a [`Prompter`] and never touch stdin
//! themselves. [`InquirePrompter`] is the terminal wizard, [`DefaultsPrompter`]
//! accepts every stated default (`--yes`), and [`ScriptedPrompter`] replays
//! fixed answers.

use std::collections::HashMap;

use anyhow::Result;
use inquire::validator::Validation;
use inquire::{Confirm, InquireError, Password, PasswordDisplayMode, Text};

use crate::dependencies::Dependency;
use crate::error::ProvisionError;

/// Every prompt the workflow can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Question {
    InstallDependency(Dependency),
    InstallDir,
    DatabaseUri,
    JwtSecret,
    OauthSecret,
    UseSupervisor,
    SupervisorBootStart,
    CustomizePort,
    PortNumber,
}

impl Question {
    pub fn message(&self) -> String {
        match self {
            Question::InstallDependency(dep) => {
                format!("{dep} is missing or too old. Install it now?")
            }
            Question::InstallDir => "Installation directory:".to_string(),
            Question::DatabaseUri => "MongoDB connection URI:".to_string(),
            Question::JwtSecret => "JWT secret:".to_string(),
            Question::OauthSecret => "OAuth token secret:".to_string(),
            Question::UseSupervisor => "Run the application under PM2?".to_string(),
            Question::SupervisorBootStart => "Start the application automatically on boot?".to_string(),
            Question::CustomizePort => "Use a port other than the default?".to_string(),
            Question::PortNumber => "Port number:".to_string(),
        }
    }

    pub fn help(&self) -> Option<&'static str> {
        match self {
            Question::InstallDependency(_) => {
                Some("Declining aborts the installation; the dependency is required")
            }
            Question::JwtSecret | Question::OauthSecret => {
                Some("Leave blank to generate a random 256-bit secret")
            }
            Question::UseSupervisor => Some("PM2 keeps the process alive and restarts it on crash"),
            Question::SupervisorBootStart => Some("Registers PM2 with the init system (needs sudo)"),
            _ => None,
        }
    }

    /// Default for yes/no questions, as stated to the operator
    pub fn default_confirm(&self) -> bool {
        !matches!(self, Question::CustomizePort)
    }

    fn is_secret(&self) -> bool {
        matches!(self, Question::JwtSecret | Question::OauthSecret)
    }
}

pub trait Prompter {
    fn confirm(&mut self, question: Question, default: bool) -> Result<bool>;

    /// Free-text answer; an empty default means "no default"
    fn input(&mut self, question: Question, default: &str) -> Result<String>;
}

fn cancelled(err: InquireError) -> anyhow::Error {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            ProvisionError::PromptCancelled("operator interrupted the prompt".to_string()).into()
        }
        other => ProvisionError::PromptCancelled(other.to_string()).into(),
    }
}

/// Terminal prompts via `inquire`
#[derive(Debug, Default)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn confirm(&mut self, question: Question, default: bool) -> Result<bool> {
        let message = question.message();
        let mut prompt = Confirm::new(&message).with_default(default);
        if let Some(help) = question.help() {
            prompt = prompt.with_help_message(help);
        }
        prompt.prompt().map_err(cancelled)
    }

    fn input(&mut self, question: Question, default: &str) -> Result<String> {
        let message = question.message();

        if question.is_secret() {
            let mut prompt = Password::new(&message)
                .without_confirmation()
                .with_display_mode(PasswordDisplayMode::Masked);
            if let Some(help) = question.help() {
                prompt = prompt.with_help_message(help);
            }
            return prompt.prompt().map_err(cancelled);
        }

        let mut prompt = Text::new(&message);
        if !default.is_empty() {
            prompt = prompt.with_default(default);
        }
        if let Some(help) = question.help() {
            prompt = prompt.with_help_message(help);
        }
        if question == Question::PortNumber {
            prompt = prompt.with_validator(|value: &str| {
                Ok(match crate::runtime_config::parse_port(value) {
                    Ok(_) => Validation::Valid,
                    Err(e) => Validation::Invalid(e.to_string().into()),
                })
            });
        }
        prompt.prompt().map_err(cancelled)
    }
}

/// Non-interactive mode: every question takes its stated default
#[derive(Debug, Default)]
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn confirm(&mut self, question: Question, default: bool) -> Result<bool> {
        log::info!("{} -> {} (default)", question.message(), default);
        Ok(default)
    }

    fn input(&mut self, question: Question, default: &str) -> Result<String> {
        log::info!("{} -> default", question.message());
        Ok(default.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Text(String),
}

/// Fixed answers keyed by question; unanswered questions take the default
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: HashMap<Question, Answer>,
    asked: Vec<Question>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, question: Question, answer: Answer) -> Self {
        self.answers.insert(question, answer);
        self
    }

    /// Questions in the order they were asked
    pub fn asked(&self) -> &[Question] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: Question, default: bool) -> Result<bool> {
        self.asked.push(question);
        Ok(match self.answers.get(&question) {
            Some(Answer::Yes) => true,
            Some(Answer::No) => false,
            Some(Answer::Text(text)) => matches!(text.trim(), "y" | "Y" | "yes"),
            None => default,
        })
    }

    fn input(&mut self, question: Question, default: &str) -> Result<String> {
        self.asked.push(question);
        Ok(match self.answers.get(&question) {
            Some(Answer::Text(text)) => text.clone(),
            _ => default.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stated_defaults() {
        assert!(Question::InstallDependency(Dependency::Runtime).default_confirm());
        assert!(Question::UseSupervisor.default_confirm());
        assert!(Question::SupervisorBootStart.default_confirm());
        assert!(!Question::CustomizePort.default_confirm());
    }

    #[test]
    fn scripted_answers_fall_back_to_defaults() {
        let mut prompter = ScriptedPrompter::new()
            .answer(Question::UseSupervisor, Answer::No)
            .answer(Question::DatabaseUri, Answer::Text("mongodb://db:27017/x".into()));

        assert!(!prompter.confirm(Question::UseSupervisor, true).unwrap());
        assert!(prompter.confirm(Question::SupervisorBootStart, true).unwrap());
        assert_eq!(
            prompter.input(Question::DatabaseUri, "mongodb://localhost").unwrap(),
            "mongodb://db:27017/x"
        );
        assert_eq!(prompter.input(Question::InstallDir, "./qid-oauth").unwrap(), "./qid-oauth");
        assert_eq!(
            prompter.asked(),
            &[
                Question::UseSupervisor,
                Question::SupervisorBootStart,
                Question::DatabaseUri,
                Question::InstallDir
            ]
        );
    }
}
