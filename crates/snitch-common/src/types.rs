//! Domain primitive types used across the snitch workspace.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Transport protocol of a socket in the connection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Transmission Control Protocol.
    Tcp,
    /// User Datagram Protocol.
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// Kernel socket state as reported by the connection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketState {
    /// Connection established.
    Established,
    /// Active open in progress.
    SynSent,
    /// Passive open in progress.
    SynRecv,
    /// Local side closed, waiting for acknowledgement.
    FinWait1,
    /// Local side closed, waiting for remote close.
    FinWait2,
    /// Closed, lingering to absorb stray segments.
    TimeWait,
    /// Fully closed.
    Close,
    /// Remote side closed.
    CloseWait,
    /// Waiting for the final acknowledgement.
    LastAck,
    /// Listening for incoming connections.
    Listen,
    /// Both sides closing simultaneously.
    Closing,
    /// Request socket of a listener.
    NewSynRecv,
    /// Stateless socket (UDP) or unknown state code.
    None,
}

impl SocketState {
    /// Decodes the hexadecimal TCP state code used by `/proc/net/tcp`.
    #[must_use]
    pub const fn from_tcp_code(code: u8) -> Self {
        match code {
            0x01 => Self::Established,
            0x02 => Self::SynSent,
            0x03 => Self::SynRecv,
            0x04 => Self::FinWait1,
            0x05 => Self::FinWait2,
            0x06 => Self::TimeWait,
            0x07 => Self::Close,
            0x08 => Self::CloseWait,
            0x09 => Self::LastAck,
            0x0A => Self::Listen,
            0x0B => Self::Closing,
            0x0C => Self::NewSynRecv,
            _ => Self::None,
        }
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Established => "ESTABLISHED",
            Self::SynSent => "SYN_SENT",
            Self::SynRecv => "SYN_RECV",
            Self::FinWait1 => "FIN_WAIT1",
            Self::FinWait2 => "FIN_WAIT2",
            Self::TimeWait => "TIME_WAIT",
            Self::Close => "CLOSE",
            Self::CloseWait => "CLOSE_WAIT",
            Self::LastAck => "LAST_ACK",
            Self::Listen => "LISTEN",
            Self::Closing => "CLOSING",
            Self::NewSynRecv => "NEW_SYN_RECV",
            Self::None => "NONE",
        };
        f.write_str(name)
    }
}

/// One row of the OS connection table.
///
/// Two rows are the same connection only if every field matches, so a
/// socket changing state shows up as a new row in the next sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Transport protocol.
    pub protocol: Protocol,
    /// Local endpoint.
    pub local: SocketAddr,
    /// Remote endpoint, absent for listening or unconnected sockets.
    pub remote: Option<SocketAddr>,
    /// Kernel socket state.
    pub status: SocketState,
    /// Owning process, absent when the socket is kernel-owned or its
    /// owner could not be determined.
    pub pid: Option<u32>,
}

impl Connection {
    /// Returns the remote IP address, if the socket has a peer.
    #[must_use]
    pub fn remote_ip(&self) -> Option<IpAddr> {
        self.remote.map(|addr| addr.ip())
    }

    /// Returns the local port.
    #[must_use]
    pub const fn local_port(&self) -> u16 {
        self.local.port()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.protocol, self.local)?;
        match self.remote {
            Some(remote) => write!(f, " -> {remote}")?,
            None => write!(f, " -> *")?,
        }
        write!(f, " {}", self.status)?;
        match self.pid {
            Some(pid) => write!(f, " pid={pid}"),
            None => write!(f, " pid=?"),
        }
    }
}

/// Attributes of the process owning a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Process id.
    pub pid: u32,
    /// Short display name.
    pub name: String,
    /// Absolute path of the executable.
    pub exe: String,
    /// Command line, arguments joined by single spaces.
    pub cmdline: String,
}

/// Direction of a packet relative to this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent from a private (local) address to a public one.
    Outgoing,
    /// Received on a private (local) address from a public one.
    Incoming,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outgoing => write!(f, "outgoing"),
            Self::Incoming => write!(f, "incoming"),
        }
    }
}

/// A boundary-crossing flow seen by packet capture, awaiting confirmation
/// by the connection poller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureCandidate {
    /// Local (private side) IP address.
    pub laddr_ip: IpAddr,
    /// Local port.
    pub laddr_port: u16,
    /// Remote (public side) IP address.
    pub raddr_ip: IpAddr,
    /// Direction of the captured packet.
    pub direction: Direction,
}

impl fmt::Display for CaptureCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local = SocketAddr::new(self.laddr_ip, self.laddr_port);
        match self.direction {
            Direction::Outgoing => write!(f, "{} {local} -> {}", self.direction, self.raddr_ip),
            Direction::Incoming => write!(f, "{} {local} <- {}", self.direction, self.raddr_ip),
        }
    }
}
