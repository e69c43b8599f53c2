//! Operator-facing console output
//!
//! Severity-tagged lines (`[INFO]`, `[SUCCESS]`, `[WARNING]`, `[ERROR]`),
//! the welcome banner and spinners for quiet long-running steps. Log records
//! go through `log`; this module is for what the operator is meant to read.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn tag(self) -> &'static str {
        match self {
            Severity::Info => "[INFO]",
            Severity::Success => "[SUCCESS]",
            Severity::Warning => "[WARNING]",
            Severity::Error => "[ERROR]",
        }
    }

    fn color(self) -> Color {
        match self {
            Severity::Info => Color::Cyan,
            Severity::Success => Color::Green,
            Severity::Warning => Color::Yellow,
            Severity::Error => Color::Red,
        }
    }
}

/// Colour only when the stream being written is a terminal and NO_COLOR is unset
fn color_choice(is_terminal: bool) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() || !is_terminal {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn stdout_choice() -> ColorChoice {
    color_choice(std::io::stdout().is_terminal())
}

/// Errors are written to stderr, so they follow stderr's terminal state
fn severity_choice(severity: Severity, stdout_tty: bool, stderr_tty: bool) -> ColorChoice {
    match severity {
        Severity::Error => color_choice(stderr_tty),
        _ => color_choice(stdout_tty),
    }
}

/// Print one tagged line; errors go to stderr, everything else to stdout
pub fn emit(severity: Severity, message: &str) {
    let choice = severity_choice(
        severity,
        std::io::stdout().is_terminal(),
        std::io::stderr().is_terminal(),
    );
    let mut stream = match severity {
        Severity::Error => StandardStream::stderr(choice),
        _ => StandardStream::stdout(choice),
    };
    let _ = stream.set_color(ColorSpec::new().set_fg(Some(severity.color())).set_bold(true));
    let _ = write!(stream, "{}", severity.tag());
    let _ = stream.reset();
    let _ = writeln!(stream, " {message}");
}

pub fn info(message: impl AsRef<str>) {
    emit(Severity::Info, message.as_ref());
}

pub fn success(message: impl AsRef<str>) {
    emit(Severity::Success, message.as_ref());
}

pub fn warning(message: impl AsRef<str>) {
    emit(Severity::Warning, message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    emit(Severity::Error, message.as_ref());
}

/// Cyan horizontal rule used to frame the banner and the summary
pub fn rule() {
    let mut stdout = StandardStream::stdout(stdout_choice());
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "{RULE}");
    let _ = stdout.reset();
}

/// Bold heading line, optionally coloured
pub fn heading(text: &str, color: Option<Color>) {
    let mut stdout = StandardStream::stdout(stdout_choice());
    let _ = stdout.set_color(ColorSpec::new().set_fg(color).set_bold(true));
    let _ = writeln!(stdout, "{text}");
    let _ = stdout.reset();
}

/// Plain, untagged line
pub fn line(text: impl AsRef<str>) {
    let mut stdout = StandardStream::stdout(stdout_choice());
    let _ = writeln!(stdout, "{}", text.as_ref());
}

/// Display welcome banner
pub fn show_welcome(app_name: &str) {
    println!();
    rule();
    heading(&format!("\n              {app_name} installer\n"), Some(Color::Cyan));
    rule();
    line("\nThis will:");
    line("  • check for Node.js, npm, MongoDB, unzip and curl/wget");
    line(format!("  • download and unpack the {app_name} bundle"));
    line("  • write config/production.json and .env");
    line("  • install dependencies and build the frontend");
    line("  • optionally run the app under PM2\n");
}

/// Steady-ticking spinner for steps that run with their own output silenced
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
