//! Reconciliation of capture candidates with polled connections.
//!
//! Once per tick the capture queue is drained into a map keyed by local
//! port. The poller removes every port it sees among the new connections;
//! whatever remains afterwards was never visible in the connection table
//! and is reported as a missed connection.
//!
//! Ports already present in the previous sample are skipped when the map
//! is built. A short-lived connection that reuses such a port is therefore
//! not reported.

use std::collections::{HashMap, HashSet};

use snitch_capture::queue::{CandidateReceiver, candidate_queue};
use snitch_capture::sniffer::Sniffer;
use snitch_common::error::Result;
use snitch_common::types::{CaptureCandidate, Connection};

/// Candidates of one tick keyed by local port; later packets win.
pub type CandidateMap = HashMap<u16, CaptureCandidate>;

/// Builds the candidate map for a tick, skipping ports already known.
pub fn build_candidate_map(
    candidates: impl IntoIterator<Item = CaptureCandidate>,
    known: &HashSet<Connection>,
) -> CandidateMap {
    let known_ports: HashSet<u16> = known.iter().map(Connection::local_port).collect();
    candidates
        .into_iter()
        .filter(|c| !known_ports.contains(&c.laddr_port))
        .map(|c| (c.laddr_port, c))
        .collect()
}

/// Owns the capture thread and the consuming end of its queue.
#[derive(Debug)]
pub struct Reconciler {
    receiver: CandidateReceiver,
    sniffer: Option<Sniffer>,
}

impl Reconciler {
    /// Starts packet capture with a queue of `capacity` candidates.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture socket or thread cannot be created.
    pub fn start(capacity: usize) -> Result<Self> {
        let (sender, receiver) = candidate_queue(capacity);
        let sniffer = Sniffer::start(sender)?;
        Ok(Self {
            receiver,
            sniffer: Some(sniffer),
        })
    }

    /// Wraps a queue fed by some other producer.
    #[must_use]
    pub const fn from_receiver(receiver: CandidateReceiver) -> Self {
        Self {
            receiver,
            sniffer: None,
        }
    }

    /// Drains the queue into a fresh candidate map for the coming tick.
    pub fn drain(&mut self, known: &HashSet<Connection>) -> CandidateMap {
        if self.sniffer.as_ref().is_some_and(|s| !s.is_running()) {
            tracing::warn!("capture thread exited, continuing with polling only");
            self.sniffer = None;
        }
        let dropped = self.receiver.take_dropped();
        if dropped > 0 {
            tracing::warn!(dropped, "capture queue full, candidates dropped");
        }
        build_candidate_map(self.receiver.drain(), known)
    }

    /// Stops the capture thread, if any.
    pub fn stop(&mut self) {
        if let Some(sniffer) = self.sniffer.take() {
            sniffer.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use snitch_common::types::{Direction, Protocol, SocketState};

    use super::*;

    fn candidate(port: u16, remote: &str) -> CaptureCandidate {
        CaptureCandidate {
            laddr_ip: "192.168.1.5".parse().expect("ip"),
            laddr_port: port,
            raddr_ip: remote.parse().expect("ip"),
            direction: Direction::Outgoing,
        }
    }

    fn connection(port: u16) -> Connection {
        Connection {
            protocol: Protocol::Tcp,
            local: format!("192.168.1.5:{port}").parse().expect("addr"),
            remote: Some("8.8.8.8:443".parse().expect("addr")),
            status: SocketState::Established,
            pid: Some(1),
        }
    }

    #[test]
    fn known_ports_are_skipped() {
        let known: HashSet<Connection> = [connection(40000)].into_iter().collect();
        let map = build_candidate_map([candidate(40000, "8.8.8.8"), candidate(40001, "1.1.1.1")], &known);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&40001));
    }

    #[test]
    fn later_candidate_for_same_port_wins() {
        let map = build_candidate_map(
            [candidate(40001, "8.8.8.8"), candidate(40001, "1.1.1.1")],
            &HashSet::new(),
        );
        assert_eq!(map[&40001].raddr_ip, "1.1.1.1".parse::<std::net::IpAddr>().expect("ip"));
    }

    #[test]
    fn reconciler_drains_external_queue() {
        let (sender, receiver) = candidate_queue(4);
        let mut reconciler = Reconciler::from_receiver(receiver);
        assert!(sender.offer(candidate(5000, "8.8.8.8")));
        let map = reconciler.drain(&HashSet::new());
        assert_eq!(map.len(), 1);
        assert!(reconciler.drain(&HashSet::new()).is_empty());
        reconciler.stop();
    }
}
