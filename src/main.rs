use clap::Parser;
use log::LevelFilter;

use qid_provision::cli::{self, Cmd};
use qid_provision::{console, error, runners};

fn main() {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            console::error(format!("Failed to create Tokio runtime: {e}"));
            std::process::exit(1);
        }
    };

    let result = rt.block_on(async {
        match args.sub.unwrap_or_else(|| Cmd::Install(cli::InstallArgs::default())) {
            Cmd::Install(install) => runners::run_install(&install).await,
            Cmd::Probe { config, json } => runners::run_probe(config.as_deref(), json).await,
            Cmd::Config { output } => runners::write_default_config(output.as_deref()),
        }
    });

    if let Err(e) = result {
        match error::classify(&e) {
            Some(typed) => console::error(format!("{} ({e:#})", typed.category())),
            None => console::error(format!("{e:#}")),
        }
        std::process::exit(1);
    }
}

/// `[millis LEVEL file:line] msg`; RUST_LOG applies unless -v is given
fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "[{} {} {}:{}] {}",
            buf.timestamp_millis(),
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        _ => {
            builder.filter_level(LevelFilter::Debug);
        }
    }
    builder.init();
}
