//! Bounded candidate queue between the capture thread and the poller.
//!
//! The producer never blocks: when the consumer falls behind and the queue
//! is full, the newest candidate is dropped and counted. The consumer
//! drains everything once per tick and reads the drop count at the same
//! time, so losses are reported rather than silent.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use snitch_common::types::CaptureCandidate;

/// Creates a queue holding at most `capacity` pending candidates.
#[must_use]
pub fn candidate_queue(capacity: usize) -> (CandidateSender, CandidateReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        CandidateSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        CandidateReceiver { rx, dropped },
    )
}

/// Producing half, owned by the capture thread.
#[derive(Debug, Clone)]
pub struct CandidateSender {
    tx: Sender<CaptureCandidate>,
    dropped: Arc<AtomicU64>,
}

impl CandidateSender {
    /// Enqueues a candidate without blocking.
    ///
    /// Returns `false` if the candidate was dropped because the queue is
    /// full or the receiver is gone.
    pub fn offer(&self, candidate: CaptureCandidate) -> bool {
        match self.tx.try_send(candidate) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consuming half, owned by the poll loop.
#[derive(Debug)]
pub struct CandidateReceiver {
    rx: Receiver<CaptureCandidate>,
    dropped: Arc<AtomicU64>,
}

impl CandidateReceiver {
    /// Removes and returns every candidate currently queued, oldest first.
    pub fn drain(&self) -> Vec<CaptureCandidate> {
        self.rx.try_iter().collect()
    }

    /// Returns the number of candidates dropped since the last call and
    /// resets the counter.
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}
