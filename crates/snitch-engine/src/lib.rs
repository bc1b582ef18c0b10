//! Connection attribution engine for the snitch monitor.
//!
//! Data flows one way: capture candidates are drained into a per-tick map,
//! the [`poller::Poller`] diffs the connection table and hands each new
//! public connection to [`attribution`], which mutates the
//! [`state::SnitchState`] owned by the [`lifecycle::Monitor`]. The monitor
//! flushes that state on a fixed cadence and once more at shutdown.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod attribution;
pub mod lifecycle;
pub mod notify;
pub mod poller;
pub mod reconcile;
pub mod shutdown;
pub mod state;
pub mod timestamp;
