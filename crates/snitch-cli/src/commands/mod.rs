//! CLI command definitions and dispatch.

pub mod errors;
pub mod run;
pub mod show;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use snitch_common::constants::{BIN_NAME, STATE_FILE_ENV, default_state_file};

/// snitch — Outbound connection monitor.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the state file [default: ~/.config/snitch/snitch.json].
    #[arg(long, global = true, env = STATE_FILE_ENV)]
    pub state_file: Option<PathBuf>,

    /// Emit diagnostic logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

impl Cli {
    /// State file chosen on the command line, in the environment, or the default.
    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(default_state_file)
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Monitor connections in the foreground until interrupted.
    Run(run::RunArgs),
    /// List every executable seen making a public connection.
    Show(show::ShowArgs),
    /// Print the recorded diagnostic errors.
    Errors(errors::ErrorsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let state_path = cli.state_path();
    match cli.command {
        Command::Run(args) => run::execute(args, &state_path),
        Command::Show(args) => show::execute(args, &state_path),
        Command::Errors(args) => errors::execute(args, &state_path),
    }
}
