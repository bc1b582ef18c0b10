//! `snitch show` — List every executable seen making a public connection.

use std::path::Path;

use clap::Args;
use snitch_engine::state::load_state;

use crate::output::{entry_header, entry_row};

/// Arguments for the `show` command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Also print the command lines and remote addresses of each entry.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Executes the `show` command.
///
/// Entries are printed sorted by executable path.
///
/// # Errors
///
/// Returns an error if the state file cannot be loaded.
pub fn execute(args: ShowArgs, state_path: &Path) -> anyhow::Result<()> {
    let state = load_state(state_path).map_err(|e| anyhow::anyhow!("{e}"))?;

    if state.processes.is_empty() {
        println!("No connections recorded yet.");
        return Ok(());
    }

    println!("{}", entry_header());
    for (executable, entry) in &state.processes {
        println!("{}", entry_row(executable, entry));
        if args.verbose {
            for cmdline in &entry.cmdlines {
                println!("    cmdline: {cmdline}");
            }
            for address in &entry.remote_addresses {
                println!("    peer:    {address}");
            }
        }
    }

    Ok(())
}
