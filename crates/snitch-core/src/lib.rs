//! # snitch-core
//!
//! Host introspection primitives for the snitch monitor.
//!
//! This crate provides safe abstractions over:
//! - **Addresses**: public/private classification of IP addresses.
//! - **Connection table**: the live socket table read from procfs.
//! - **Processes**: name, executable, and command line of a pid.
//! - **Privileges**: effective-user checks for features that need root.
//!
//! The engine depends only on the [`net::ConnectionTable`] and
//! [`process::ProcessLookup`] traits, so tests can substitute fakes.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod address;
pub mod net;
pub mod privilege;
pub mod process;
