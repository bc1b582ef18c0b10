//! User-visible notifications.
//!
//! Delivery is best-effort and never blocks the poll loop: the desktop
//! notifier runs `notify-send` on a short-lived thread. When no desktop
//! notifier is usable, or `notify-send` fails or exits non-zero, the
//! message goes to the log instead.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use snitch_common::constants::APP_NAME;

/// Sink for messages meant for the user.
pub trait Notifier: Send {
    /// Delivers `message`, falling back to the diagnostic log on failure.
    fn notify(&self, message: &str);
}

/// Sends desktop notifications through `notify-send`.
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier {
    program: Option<PathBuf>,
}

impl DesktopNotifier {
    /// Locates `notify-send` on the `PATH`.
    ///
    /// A missing program is not an error; messages are then logged only.
    #[must_use]
    pub fn new() -> Self {
        let program = which::which("notify-send").ok();
        if program.is_none() {
            tracing::info!("notify-send not found, notifications go to the log");
        }
        Self { program }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &str) {
        let Some(program) = &self.program else {
            log_message(message);
            return;
        };
        let program = program.clone();
        let owned = message.to_owned();
        // Deliver in the background so the loop never waits on the desktop.
        let spawned = std::thread::Builder::new()
            .name("snitch-notify".into())
            .spawn(move || {
                let _ = deliver_or_log(&program, &owned);
            });
        if let Err(e) = spawned {
            tracing::debug!(error = %e, "cannot spawn notification thread");
            log_message(message);
        }
    }
}

/// Runs `program` to show `message` and waits for it to exit.
///
/// Any failure, including a non-zero exit status, sends the message to
/// the log instead. Returns whether the desktop accepted the message.
pub fn deliver_or_log(program: &Path, message: &str) -> bool {
    let status = Command::new(program)
        .arg(format!("--app-name={APP_NAME}"))
        .arg(APP_NAME)
        .arg(message)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            tracing::debug!(%status, "desktop notification rejected");
            log_message(message);
            false
        }
        Err(e) => {
            tracing::debug!(error = %e, "desktop notification failed");
            log_message(message);
            false
        }
    }
}

/// Writes every notification to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log_message(message);
    }
}

/// Keeps notifications in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every message received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_owned());
        }
    }
}

fn log_message(message: &str) {
    tracing::warn!(target: "snitch::notify", "{message}");
}
