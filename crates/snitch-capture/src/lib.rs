//! # snitch-capture
//!
//! Packet-level observation for the snitch monitor.
//!
//! The connection poller only sees sockets that are alive at a sample
//! instant. This crate watches raw traffic on a separate thread and
//! reports every flow crossing the private/public boundary, so that
//! connections opened and closed between two samples can still be flagged:
//! - **Packet parsing**: IPv4/IPv6 headers with TCP/UDP ports.
//! - **Classification**: direction relative to the host, or drop.
//! - **Queue**: bounded hand-off to the poller with drop accounting.
//! - **Sniffer**: the capture worker thread and its stop handle.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod packet;
pub mod queue;
pub mod sniffer;
