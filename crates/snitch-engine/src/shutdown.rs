//! Cooperative shutdown signal.
//!
//! Signal handlers only call [`ShutdownSignal::trigger`]; the flush and
//! exit happen on the thread that owns the state, after the run loop
//! observes the request. The inter-tick sleep waits on the signal so a
//! request cuts it short.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// Shared, cloneable shutdown request flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
        }
    }

    /// Requests shutdown. Only the first call has any effect.
    pub fn trigger(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            let _ = self.tx.try_send(());
        }
    }

    /// Returns whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleeps for `timeout` or until shutdown is requested.
    ///
    /// Returns `true` if shutdown has been requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => self.is_triggered(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn untriggered_wait_times_out() {
        let signal = ShutdownSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
        assert!(!signal.is_triggered());
    }

    #[test]
    fn trigger_from_another_thread_interrupts_wait() {
        let signal = ShutdownSignal::new();
        let remote = signal.clone();
        let start = Instant::now();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.trigger();
        });
        assert!(signal.wait_timeout(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().expect("join");
    }

    #[test]
    fn repeated_triggers_are_harmless() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.wait_timeout(Duration::from_millis(1)));
        assert!(signal.wait_timeout(Duration::from_millis(1)));
    }
}
