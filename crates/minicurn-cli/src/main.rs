//! # minicurn
//!
//! Runs one command inside a throwaway jail: its own PID, UTS, and mount
//! namespaces, a chrooted root filesystem bundle, and a private `/proc`.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod commands;
mod output;

use std::io::IsTerminal;

use clap::Parser;
use clap::error::ErrorKind;
use minicurn_common::constants::FAILURE_EXIT_CODE;
use minicurn_common::error::MinicurnError;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

const TOO_FEW_ARGUMENTS: &str = "Too few arguments";

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => error.exit(),
            kind if is_missing_input(kind) => {
                output::report_error(&MinicurnError::usage(TOO_FEW_ARGUMENTS));
                std::process::exit(FAILURE_EXIT_CODE);
            }
            _ => {
                let _ = error.print();
                std::process::exit(FAILURE_EXIT_CODE);
            }
        },
    };
    init_tracing(cli.debug);
    commands::execute(cli)
}

/// Parse failures that mean the command line stopped short, wherever the
/// missing word was due.
const fn is_missing_input(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::MissingRequiredArgument
            | ErrorKind::MissingSubcommand
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

/// Logs go to stderr so the jailed program owns stdout. `RUST_LOG` wins
/// over `--debug`.
fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}
