//! Run-loop lifecycle of the monitor.
//!
//! `Loading -> Running -> Flushing -> Terminated`. The monitor owns the
//! state for the whole run and lends it to the poller one tick at a time.
//! It flushes the state every `write_interval_ticks` ticks, and once more
//! when the run loop observes a shutdown request.

use std::path::{Path, PathBuf};

use snitch_common::constants::CAPTURE_QUEUE_CAPACITY;
use snitch_common::error::Result;
use snitch_core::net::ConnectionTable;
use snitch_core::process::ProcessLookup;

use crate::notify::Notifier;
use crate::poller::{Poller, TickReport};
use crate::reconcile::{CandidateMap, Reconciler};
use crate::shutdown::ShutdownSignal;
use crate::state::{SnitchState, load_state, save_state};
use crate::timestamp;

/// Lifecycle phase of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// State loaded, loop not yet started.
    Loading,
    /// Tick loop active.
    Running,
    /// Final flush in progress.
    Flushing,
    /// Final flush done; the monitor will not tick again.
    Terminated,
}

/// Owns the state and drives the poll loop.
pub struct Monitor {
    state: SnitchState,
    state_path: PathBuf,
    poller: Poller,
    reconciler: Option<Reconciler>,
    notifier: Box<dyn Notifier>,
    phase: Phase,
    ticks_since_flush: u64,
    write_ticks: u64,
}

impl Monitor {
    /// Loads the state at `state_path` and prepares the monitor.
    ///
    /// Packet capture is started when the configuration asks for it. If it
    /// cannot start, the monitor notifies and continues with polling only.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file exists but cannot be loaded.
    pub fn load(
        state_path: impl Into<PathBuf>,
        table: Box<dyn ConnectionTable>,
        lookup: Box<dyn ProcessLookup>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self> {
        Self::load_with(state_path, table, lookup, notifier, Reconciler::start)
    }

    /// Like [`Monitor::load`], with `start_capture` opening the capture
    /// path when the configuration enables it.
    ///
    /// `start_capture` receives the queue capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file exists but cannot be loaded.
    pub fn load_with(
        state_path: impl Into<PathBuf>,
        table: Box<dyn ConnectionTable>,
        lookup: Box<dyn ProcessLookup>,
        notifier: Box<dyn Notifier>,
        start_capture: impl FnOnce(usize) -> Result<Reconciler>,
    ) -> Result<Self> {
        let state_path = state_path.into();
        let state = load_state(&state_path)?;
        tracing::info!(
            path = %state_path.display(),
            polling_interval = state.config.polling_interval_secs,
            write_interval = state.config.write_interval_secs,
            capture = state.config.use_capture,
            processes = state.processes.len(),
            "state loaded"
        );
        let reconciler = if state.config.use_capture {
            match start_capture(CAPTURE_QUEUE_CAPACITY) {
                Ok(reconciler) => Some(reconciler),
                Err(e) => {
                    tracing::warn!(error = %e, "packet capture unavailable, polling only");
                    notifier.notify(&format!("packet capture unavailable, polling only: {e}"));
                    None
                }
            }
        } else {
            None
        };
        Ok(Self::new(state, state_path, Poller::new(table, lookup), reconciler, notifier))
    }

    /// Assembles a monitor from already-loaded parts.
    #[must_use]
    pub fn new(
        state: SnitchState,
        state_path: PathBuf,
        poller: Poller,
        reconciler: Option<Reconciler>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let write_ticks = state.config.write_interval_ticks();
        Self {
            state,
            state_path,
            poller,
            reconciler,
            notifier,
            phase: Phase::Loading,
            ticks_since_flush: 0,
            write_ticks,
        }
    }

    /// Current observation history.
    #[must_use]
    pub const fn state(&self) -> &SnitchState {
        &self.state
    }

    /// Path the state is flushed to.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether packet capture feeds this monitor.
    #[must_use]
    pub const fn capture_enabled(&self) -> bool {
        self.reconciler.is_some()
    }

    /// Drains capture candidates and runs one poller tick at `now`.
    pub fn tick_at(&mut self, now: &str) -> TickReport {
        let candidates = self
            .reconciler
            .as_mut()
            .map_or_else(CandidateMap::new, |r| r.drain(self.poller.known_connections()));
        let report = self
            .poller
            .tick(&mut self.state, candidates, self.notifier.as_ref(), now);
        if report != TickReport::default() {
            tracing::debug!(?report, "tick");
        }
        report
    }

    /// Runs the loop until `shutdown` is triggered, then terminates.
    ///
    /// The shutdown request is checked before each tick and interrupts the
    /// sleep between ticks. The final flush runs on the calling thread.
    pub fn run(&mut self, shutdown: &ShutdownSignal) {
        if self.phase == Phase::Terminated {
            return;
        }
        self.phase = Phase::Running;
        let interval = self.state.config.polling_interval();
        tracing::info!(?interval, write_ticks = self.write_ticks, "monitor running");

        while !shutdown.is_triggered() {
            let _ = self.tick_at(&timestamp::now());
            if shutdown.wait_timeout(interval) {
                break;
            }
            self.advance_flush_counter();
        }
        tracing::info!("shutdown requested");
        self.terminate();
    }

    /// Counts one completed tick and flushes when the write interval is up.
    pub fn advance_flush_counter(&mut self) {
        self.ticks_since_flush += 1;
        if self.ticks_since_flush >= self.write_ticks {
            let _ = self.flush();
            self.ticks_since_flush = 0;
        }
    }

    /// Writes the state to disk.
    ///
    /// Failure is notified and logged; the in-memory state is kept for the
    /// next attempt. Returns whether the write succeeded.
    pub fn flush(&mut self) -> bool {
        match save_state(&self.state_path, &self.state) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = %self.state_path.display(), error = %e, "state write failed");
                self.notifier.notify(&format!("write error: {e}"));
                false
            }
        }
    }

    /// Stops capture and performs the final flush. Later calls do nothing.
    pub fn terminate(&mut self) {
        if self.phase == Phase::Terminated {
            return;
        }
        self.phase = Phase::Flushing;
        if let Some(reconciler) = self.reconciler.as_mut() {
            reconciler.stop();
        }
        if self.flush() {
            tracing::info!(path = %self.state_path.display(), "state flushed");
        }
        self.phase = Phase::Terminated;
    }
}
