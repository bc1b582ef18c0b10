//! Connection table poller.
//!
//! Each tick samples the table, diffs it against the previous sample, and
//! attributes every new connection with a public peer. Failures are
//! scoped to the connection that caused them: they are recorded and
//! notified, and the tick moves on.

use std::collections::HashSet;

use snitch_common::error::{Result, SnitchError};
use snitch_common::types::{Connection, ProcessInfo, SocketState};
use snitch_core::address::is_public;
use snitch_core::net::ConnectionTable;
use snitch_core::process::ProcessLookup;

use crate::attribution::{Attribution, attribute};
use crate::notify::Notifier;
use crate::reconcile::CandidateMap;
use crate::state::SnitchState;

/// Counters describing one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Connections present now but not in the previous sample.
    pub new_connections: usize,
    /// New connections credited to an executable.
    pub attributed: usize,
    /// Executables seen for the first time.
    pub created: usize,
    /// New public connections whose owner could not be resolved.
    pub failures: usize,
    /// Capture candidates never seen in the table.
    pub missed: usize,
}

/// Samples the connection table and attributes new connections.
pub struct Poller {
    table: Box<dyn ConnectionTable>,
    lookup: Box<dyn ProcessLookup>,
    previous: HashSet<Connection>,
}

impl Poller {
    /// Creates a poller with an empty previous sample.
    #[must_use]
    pub fn new(table: Box<dyn ConnectionTable>, lookup: Box<dyn ProcessLookup>) -> Self {
        Self {
            table,
            lookup,
            previous: HashSet::new(),
        }
    }

    /// Connections of the latest successful sample.
    #[must_use]
    pub const fn known_connections(&self) -> &HashSet<Connection> {
        &self.previous
    }

    /// Runs one tick at time `now`.
    ///
    /// `candidates` is consumed: entries whose local port appears among
    /// the new public connections are confirmed, the rest are recorded as
    /// missed connections. If the table cannot be read the previous sample
    /// is kept, the candidates are discarded, and the gap is recorded in
    /// the errors with the number of candidates lost. The user is only
    /// notified when candidates were lost.
    pub fn tick(
        &mut self,
        state: &mut SnitchState,
        mut candidates: CandidateMap,
        notifier: &dyn Notifier,
        now: &str,
    ) -> TickReport {
        let mut report = TickReport::default();
        let current = match self.table.snapshot() {
            Ok(current) => current,
            Err(e) => {
                let discarded = candidates.len();
                tracing::error!(error = %e, discarded, "cannot read connection table");
                let description =
                    format!("cannot read connection table, {discarded} capture candidates discarded: {e}");
                state.record_error(now, &description);
                if discarded > 0 {
                    notifier.notify(&format!("polling error: {description}"));
                }
                return report;
            }
        };

        for conn in current.difference(&self.previous) {
            report.new_connections += 1;
            let Some(remote_ip) = conn.remote_ip().filter(|ip| is_public(*ip)) else {
                continue;
            };
            let _ = candidates.remove(&conn.local_port());

            match self.resolve(conn) {
                Ok(Some(process)) => {
                    report.attributed += 1;
                    if attribute(state, &process, &remote_ip.to_string(), now) == Attribution::Created {
                        report.created += 1;
                        notifier.notify(&format!("First network connection detected for {}", process.name));
                    }
                }
                Ok(None) => {
                    tracing::trace!(connection = %conn, "kernel-owned socket skipped");
                }
                Err(e) => {
                    report.failures += 1;
                    let description = format!("{conn}: {e}");
                    tracing::warn!(connection = %conn, error = %e, "cannot attribute connection");
                    state.record_error(now, &description);
                    notifier.notify(&format!("polling error: {description}"));
                }
            }
        }

        let mut missed: Vec<_> = candidates.into_values().collect();
        missed.sort_by_key(|c| c.laddr_port);
        for candidate in missed {
            report.missed += 1;
            let description = format!("missed connection: {candidate}");
            tracing::warn!(candidate = %candidate, "connection missed by poller");
            state.record_error(now, &description);
            notifier.notify(&description);
        }

        self.previous = current;
        report
    }

    /// Resolves the owner of a connection.
    ///
    /// `Ok(None)` marks a `TIME_WAIT` socket the kernel keeps after its
    /// owner closed it; there is nothing left to attribute.
    fn resolve(&self, conn: &Connection) -> Result<Option<ProcessInfo>> {
        match conn.pid {
            Some(pid) => self.lookup.lookup(pid).map(Some),
            None if conn.status == SocketState::TimeWait => Ok(None),
            None => Err(SnitchError::NotFound {
                kind: "owning process",
                id: format!("port {}", conn.local_port()),
            }),
        }
    }
}
