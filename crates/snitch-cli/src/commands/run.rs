//! `snitch run` — Monitor connections in the foreground.

use std::path::Path;

use clap::Args;
use snitch_core::net::detect_table;
use snitch_core::privilege::warn_if_unprivileged;
use snitch_core::process::ProcProcessLookup;
use snitch_engine::lifecycle::Monitor;
use snitch_engine::notify::{DesktopNotifier, LogNotifier, Notifier};
use snitch_engine::shutdown::ShutdownSignal;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Log notifications instead of sending desktop notifications.
    #[arg(long)]
    pub no_desktop: bool,
}

/// Executes the `run` command.
///
/// Loads the state, starts monitoring and blocks until SIGINT or SIGTERM.
/// The state is flushed once more before returning.
///
/// # Errors
///
/// Returns an error if the state file cannot be loaded or the signal
/// handler cannot be installed.
pub fn execute(args: RunArgs, state_path: &Path) -> anyhow::Result<()> {
    let notifier: Box<dyn Notifier> = if args.no_desktop {
        Box::new(LogNotifier)
    } else {
        Box::new(DesktopNotifier::new())
    };

    let mut monitor = Monitor::load(
        state_path,
        detect_table(),
        Box::new(ProcProcessLookup::new()),
        notifier,
    )
    .map_err(|e| anyhow::anyhow!("cannot load state from {}: {e}", state_path.display()))?;
    warn_if_unprivileged(monitor.state().config.use_capture);

    let shutdown = ShutdownSignal::new();
    let handler = shutdown.clone();
    ctrlc::set_handler(move || handler.trigger())
        .map_err(|e| anyhow::anyhow!("failed to set signal handler: {e}"))?;

    tracing::info!(
        path = %monitor.state_path().display(),
        capture = monitor.capture_enabled(),
        "monitoring started"
    );
    monitor.run(&shutdown);
    tracing::info!("monitoring stopped");

    Ok(())
}
