//! bttf: pack a directory tree into a compressed container, or restore one.
//!
//! Without positional arguments bttf browses for an item and packs it; with
//! one it unpacks that container. The exit code is the numeric status.

mod browser;
mod cli;
mod commands;
mod error;
mod output;
mod progress;

use std::process::ExitCode;

use anyhow::Result;
use bttf_core::ArchiverError;
use bttf_core::Status;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::Cli;
use crate::cli::Mode;
use crate::output::Operation;
use crate::output::OutputFormatter;

/// Set to any value to force debug logging.
const DEBUG_LOG_ENV: &str = "BTTF_DEBUG_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    tracing::debug!(?cli, "parsed arguments");

    let formatter = output::create_formatter(cli.json, cli.verbose > 0, cli.quiet);
    let status = match run(&cli, &*formatter) {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("command failed: {e:?}");
            formatter.format_error(&e);
            Status::CriticalError
        }
    };
    ExitCode::from(status.code())
}

fn run(cli: &Cli, formatter: &dyn OutputFormatter) -> Result<Status> {
    match cli.mode() {
        Mode::Pack => commands::pack::execute(cli, formatter),
        Mode::Unpack(container) => commands::unpack::execute(cli, container, formatter),
        Mode::TooManyArgs(count) => {
            tracing::warn!(count, "too many arguments");
            let err = ArchiverError::TooManyArgs { count };
            formatter.format_failure(Operation::Usage, &err)?;
            Ok(err.status())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let env_filter = if std::env::var_os(DEBUG_LOG_ENV).is_some() {
        EnvFilter::new("debug")
    } else {
        let level = match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
