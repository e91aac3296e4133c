//! CLI command definitions and dispatch.

pub mod run;

use clap::{Parser, Subcommand};
use minicurn_common::constants::APP_NAME;

/// minicurn: run a command in a minimal namespace jail.
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command inside a fresh jail and wait for it to terminate.
    Run(run::RunArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
    }
}
