//! `snitch errors` — Print the recorded diagnostic errors.

use std::path::Path;

use clap::Args;
use snitch_engine::state::load_state;

use crate::output::tail;

/// Arguments for the `errors` command.
#[derive(Args, Debug)]
pub struct ErrorsArgs {
    /// Only print the last N errors.
    #[arg(short = 'n', long)]
    pub tail: Option<usize>,
}

/// Executes the `errors` command.
///
/// # Errors
///
/// Returns an error if the state file cannot be loaded.
pub fn execute(args: ErrorsArgs, state_path: &Path) -> anyhow::Result<()> {
    let state = load_state(state_path).map_err(|e| anyhow::anyhow!("{e}"))?;

    if state.errors.is_empty() {
        println!("No errors recorded.");
        return Ok(());
    }

    for line in tail(&state.errors, args.tail) {
        println!("{line}");
    }

    Ok(())
}
