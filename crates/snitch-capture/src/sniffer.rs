//! Capture worker thread.
//!
//! Reads every packet seen by the host from a cooked `AF_PACKET` socket and
//! forwards boundary-crossing flows to the candidate queue. The socket has
//! a receive timeout so the worker notices a stop request promptly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use snitch_common::error::{Result, SnitchError};

use crate::packet::candidate_from_packet;
use crate::queue::CandidateSender;

/// Receive timeout of the capture socket, in milliseconds.
pub const RECV_TIMEOUT_MS: i64 = 250;

/// Largest packet read in one call.
const SNAPLEN: usize = 65_536;

/// Handle to a running capture thread.
///
/// Dropping the handle stops the thread and waits for it to exit.
#[derive(Debug)]
pub struct Sniffer {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sniffer {
    /// Opens the capture socket and starts the worker thread.
    ///
    /// The socket is opened before the thread is spawned, so a missing
    /// privilege is reported here rather than lost inside the worker.
    ///
    /// # Errors
    ///
    /// Returns [`SnitchError::PermissionDenied`] without `CAP_NET_RAW` and
    /// [`SnitchError::Capture`] for any other socket or thread failure.
    #[cfg(target_os = "linux")]
    pub fn start(sender: CandidateSender) -> Result<Self> {
        let fd = linux::open_socket()?;
        let stop = Arc::new(AtomicBool::new(false));
        let handle = std::thread::Builder::new()
            .name("snitch-capture".into())
            .spawn({
                let stop = Arc::clone(&stop);
                move || linux::capture_loop(&fd, &sender, &stop)
            })
            .map_err(|e| SnitchError::Capture {
                message: format!("cannot spawn capture thread: {e}"),
            })?;
        tracing::info!("packet capture started");
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error: raw packet capture requires Linux.
    #[cfg(not(target_os = "linux"))]
    pub fn start(_sender: CandidateSender) -> Result<Self> {
        Err(SnitchError::Capture {
            message: "Linux required for packet capture".into(),
        })
    }

    /// Returns whether the worker thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the worker thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("capture thread panicked");
            } else {
                tracing::info!("packet capture stopped");
            }
        }
    }
}

impl Drop for Sniffer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Forwards one raw packet to the queue if it crosses the boundary.
///
/// Returns whether a candidate was enqueued.
pub fn forward_packet(data: &[u8], sender: &CandidateSender) -> bool {
    candidate_from_packet(data).is_some_and(|candidate| sender.offer(candidate))
}

#[cfg(target_os = "linux")]
mod linux {
    use std::os::fd::{AsRawFd, OwnedFd};
    use std::sync::atomic::{AtomicBool, Ordering};

    use nix::errno::Errno;
    use nix::sys::socket::{
        AddressFamily, MsgFlags, SockFlag, SockProtocol, SockType, recv, setsockopt, socket,
        sockopt,
    };
    use nix::sys::time::{TimeVal, TimeValLike};
    use snitch_common::error::{Result, SnitchError};

    use super::{RECV_TIMEOUT_MS, SNAPLEN, forward_packet};
    use crate::queue::CandidateSender;

    pub(super) fn open_socket() -> Result<OwnedFd> {
        let fd = socket(
            AddressFamily::Packet,
            SockType::Datagram,
            SockFlag::SOCK_CLOEXEC,
            SockProtocol::EthAll,
        )
        .map_err(|e| match e {
            Errno::EPERM | Errno::EACCES => SnitchError::PermissionDenied {
                message: format!("opening packet socket requires CAP_NET_RAW: {e}"),
            },
            _ => SnitchError::Capture {
                message: format!("cannot open packet socket: {e}"),
            },
        })?;
        setsockopt(
            &fd,
            sockopt::ReceiveTimeout,
            &TimeVal::milliseconds(RECV_TIMEOUT_MS),
        )
        .map_err(|e| SnitchError::Capture {
            message: format!("cannot set capture receive timeout: {e}"),
        })?;
        Ok(fd)
    }

    pub(super) fn capture_loop(fd: &OwnedFd, sender: &CandidateSender, stop: &AtomicBool) {
        let mut buf = vec![0u8; SNAPLEN];
        while !stop.load(Ordering::SeqCst) {
            match recv(fd.as_raw_fd(), &mut buf, MsgFlags::empty()) {
                Ok(len) => {
                    let _ = forward_packet(&buf[..len], sender);
                }
                Err(Errno::EAGAIN | Errno::EINTR) => {}
                Err(e) => {
                    tracing::error!(error = %e, "packet capture failed");
                    break;
                }
            }
        }
    }
}
