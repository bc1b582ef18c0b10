//! Connection table backed by `/proc/net/{tcp,tcp6,udp,udp6}`.
//!
//! Addresses in these files are hex-encoded in host byte order. Socket
//! ownership is not part of the table: it is recovered by matching socket
//! inodes against the `socket:[inode]` links under `/proc/<pid>/fd`.
//!
//! Ownership is cached per inode for as long as the socket stays in the
//! table, so each tick only scans for sockets it has not seen before.
//! An inode no process could be found for stays unowned until it leaves
//! the table.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use snitch_common::constants::PROC_ROOT;
use snitch_common::error::{Result, SnitchError};
use snitch_common::types::{Connection, Protocol, SocketState};

use super::ConnectionTable;
use crate::address::canonical;

const TABLES: [(&str, Protocol); 4] = [
    ("tcp", Protocol::Tcp),
    ("tcp6", Protocol::Tcp),
    ("udp", Protocol::Udp),
    ("udp6", Protocol::Udp),
];

/// One parsed row of a `/proc/net` socket table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSocket {
    /// Transport protocol of the table the row came from.
    pub protocol: Protocol,
    /// Local endpoint.
    pub local: SocketAddr,
    /// Remote endpoint; `None` for the all-zero placeholder.
    pub remote: Option<SocketAddr>,
    /// Decoded socket state.
    pub status: SocketState,
    /// Socket inode, zero for sockets no longer attached to a file.
    pub inode: u64,
}

/// Reads the socket tables of a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcNetTable {
    root: PathBuf,
    owners: HashMap<u64, u32>,
    unowned: HashSet<u64>,
}

impl ProcNetTable {
    /// Creates a table reader for the host's `/proc`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    /// Creates a table reader for a procfs tree mounted at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            owners: HashMap::new(),
            unowned: HashSet::new(),
        }
    }

    /// Reads every row of the four socket tables.
    ///
    /// A missing table file (IPv6 disabled, for instance) is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a table file exists but cannot be read.
    pub fn read_sockets(&self) -> Result<Vec<RawSocket>> {
        let mut sockets = Vec::new();
        for (file, protocol) in TABLES {
            let path = self.root.join("net").join(file);
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::trace!(path = %path.display(), "socket table absent");
                    continue;
                }
                Err(e) => return Err(SnitchError::Io { path, source: e }),
            };
            sockets.extend(
                content
                    .lines()
                    .skip(1)
                    .filter_map(|line| parse_line(line, protocol)),
            );
        }
        Ok(sockets)
    }
}

impl Default for ProcNetTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTable for ProcNetTable {
    fn snapshot(&mut self) -> Result<HashSet<Connection>> {
        let sockets = self.read_sockets()?;
        let live: HashSet<u64> = sockets
            .iter()
            .map(|s| s.inode)
            .filter(|&inode| inode != 0)
            .collect();
        self.refresh_owners(&live);
        Ok(sockets
            .into_iter()
            .map(|s| Connection {
                protocol: s.protocol,
                local: s.local,
                remote: s.remote,
                status: s.status,
                pid: self.owners.get(&s.inode).copied(),
            })
            .collect())
    }
}

impl ProcNetTable {
    /// Forgets inodes that left the table and resolves the new ones.
    fn refresh_owners(&mut self, live: &HashSet<u64>) {
        self.owners.retain(|inode, _| live.contains(inode));
        self.unowned.retain(|inode| live.contains(inode));
        let fresh: HashSet<u64> = live
            .iter()
            .copied()
            .filter(|inode| !self.owners.contains_key(inode) && !self.unowned.contains(inode))
            .collect();
        if fresh.is_empty() {
            return;
        }
        let Some(found) = socket_owners(&self.root, &fresh) else {
            return;
        };
        self.unowned
            .extend(fresh.iter().copied().filter(|inode| !found.contains_key(inode)));
        tracing::trace!(new = fresh.len(), resolved = found.len(), "socket owners scanned");
        self.owners.extend(found);
    }
}

/// Parses one data row of a socket table.
///
/// Returns `None` for headers and malformed rows.
#[must_use]
pub fn parse_line(line: &str, protocol: Protocol) -> Option<RawSocket> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 10 {
        return None;
    }
    let local = parse_endpoint(fields[1])?;
    let remote = parse_endpoint(fields[2])?;
    let code = u8::from_str_radix(fields[3], 16).ok()?;
    let status = match protocol {
        Protocol::Tcp => SocketState::from_tcp_code(code),
        Protocol::Udp => SocketState::None,
    };
    let inode = fields[9].parse().ok()?;
    let remote = (!(remote.ip().is_unspecified() && remote.port() == 0)).then_some(remote);
    Some(RawSocket {
        protocol,
        local,
        remote,
        status,
        inode,
    })
}

/// Decodes a `HEXADDR:HEXPORT` endpoint.
///
/// IPv4 addresses are 8 hex digits, IPv6 addresses 32 digits made of four
/// host-order 32-bit words. IPv4-mapped IPv6 addresses are canonicalized.
#[must_use]
pub fn parse_endpoint(field: &str) -> Option<SocketAddr> {
    let (ip_hex, port_hex) = field.split_once(':')?;
    let port = u16::from_str_radix(port_hex, 16).ok()?;
    let ip = match ip_hex.len() {
        8 => {
            let word = u32::from_str_radix(ip_hex, 16).ok()?;
            IpAddr::V4(Ipv4Addr::from(word.to_ne_bytes()))
        }
        32 => {
            let mut bytes = [0u8; 16];
            for (i, chunk) in bytes.chunks_exact_mut(4).enumerate() {
                let word = u32::from_str_radix(ip_hex.get(i * 8..i * 8 + 8)?, 16).ok()?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            IpAddr::V6(Ipv6Addr::from(bytes))
        }
        _ => return None,
    };
    Some(SocketAddr::new(canonical(ip), port))
}

/// Maps each wanted socket inode to the first pid holding it open.
///
/// Process directories that vanish or deny access mid-scan are skipped;
/// their sockets simply stay unattributed. Returns `None` if the process
/// list itself cannot be read.
fn socket_owners(root: &Path, wanted: &HashSet<u64>) -> Option<HashMap<u64, u32>> {
    let mut owners = HashMap::new();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %root.display(), error = %e, "cannot list processes");
            return None;
        }
    };
    for entry in entries.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        let Ok(fds) = fs::read_dir(entry.path().join("fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            let Ok(target) = fs::read_link(fd.path()) else {
                continue;
            };
            if let Some(inode) = socket_inode(&target) {
                if wanted.contains(&inode) {
                    let _ = owners.entry(inode).or_insert(pid);
                }
            }
        }
        if owners.len() == wanted.len() {
            break;
        }
    }
    Some(owners)
}

fn socket_inode(target: &Path) -> Option<u64> {
    target
        .to_str()?
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use super::*;

    const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

    fn hex_v4(octets: [u8; 4]) -> String {
        format!("{:08X}", u32::from_ne_bytes(octets))
    }

    fn hex_v6(addr: Ipv6Addr) -> String {
        addr.octets()
            .chunks_exact(4)
            .map(|c| format!("{:08X}", u32::from_ne_bytes([c[0], c[1], c[2], c[3]])))
            .collect()
    }

    fn row(local: &str, remote: &str, state: &str, inode: u64) -> String {
        format!("   0: {local} {remote} {state} 00000000:00000000 00:00000000 00000000  1000        0 {inode} 1 0000000000000000 20 4 30 10 -1")
    }

    fn write_table(root: &Path, name: &str, rows: &[String]) {
        let dir = root.join("net");
        fs::create_dir_all(&dir).expect("mkdir net");
        let mut content = String::from(HEADER);
        for r in rows {
            content.push('\n');
            content.push_str(r);
        }
        content.push('\n');
        fs::write(dir.join(name), content).expect("write table");
    }

    fn own_socket(root: &Path, pid: u32, fd: u32, inode: u64) {
        let dir = root.join(pid.to_string()).join("fd");
        fs::create_dir_all(&dir).expect("mkdir fd");
        symlink(format!("socket:[{inode}]"), dir.join(fd.to_string())).expect("symlink");
    }

    #[test]
    fn parse_endpoint_decodes_ipv4() {
        let field = format!("{}:01BB", hex_v4([93, 184, 216, 34]));
        let addr = parse_endpoint(&field).expect("endpoint");
        assert_eq!(addr, "93.184.216.34:443".parse().expect("addr"));
    }

    #[test]
    fn parse_endpoint_decodes_ipv6() {
        let ip: Ipv6Addr = "2606:4700:4700::1111".parse().expect("ip");
        let field = format!("{}:0035", hex_v6(ip));
        let addr = parse_endpoint(&field).expect("endpoint");
        assert_eq!(addr, SocketAddr::new(IpAddr::V6(ip), 53));
    }

    #[test]
    fn parse_endpoint_canonicalizes_mapped_ipv4() {
        let ip: Ipv6Addr = "::ffff:8.8.8.8".parse().expect("ip");
        let field = format!("{}:0050", hex_v6(ip));
        let addr = parse_endpoint(&field).expect("endpoint");
        assert_eq!(addr, "8.8.8.8:80".parse().expect("addr"));
    }

    #[test]
    fn parse_endpoint_rejects_garbage() {
        assert!(parse_endpoint("zz:0050").is_none());
        assert!(parse_endpoint("0100007F").is_none());
        assert!(parse_endpoint("0100:0050").is_none());
    }

    #[test]
    fn parse_line_treats_zero_remote_as_absent() {
        let line = row(&format!("{}:0035", hex_v4([127, 0, 0, 53])), "00000000:0000", "0A", 77);
        let socket = parse_line(&line, Protocol::Tcp).expect("row");
        assert_eq!(socket.remote, None);
        assert_eq!(socket.status, SocketState::Listen);
        assert_eq!(socket.inode, 77);
    }

    #[test]
    fn parse_line_skips_header() {
        assert!(parse_line(HEADER, Protocol::Tcp).is_none());
    }

    #[test]
    fn udp_rows_have_no_tcp_state() {
        let line = row(
            &format!("{}:D431", hex_v4([192, 168, 1, 5])),
            &format!("{}:0035", hex_v4([8, 8, 8, 8])),
            "01",
            9,
        );
        let socket = parse_line(&line, Protocol::Udp).expect("row");
        assert_eq!(socket.status, SocketState::None);
    }

    #[test]
    fn snapshot_attributes_sockets_to_owning_pid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let local = format!("{}:C350", hex_v4([192, 168, 1, 5]));
        let remote = format!("{}:01BB", hex_v4([93, 184, 216, 34]));
        write_table(
            dir.path(),
            "tcp",
            &[row(&local, &remote, "01", 5555), row(&local, &remote, "06", 0)],
        );
        own_socket(dir.path(), 4242, 3, 5555);
        own_socket(dir.path(), 4243, 7, 9999);

        let mut table = ProcNetTable::with_root(dir.path());
        let snapshot = table.snapshot().expect("snapshot");
        assert_eq!(snapshot.len(), 2);

        let established = snapshot
            .iter()
            .find(|c| c.status == SocketState::Established)
            .expect("established row");
        assert_eq!(established.pid, Some(4242));
        assert_eq!(established.local_port(), 50000);
        assert_eq!(
            established.remote_ip(),
            Some("93.184.216.34".parse().expect("ip"))
        );

        let time_wait = snapshot
            .iter()
            .find(|c| c.status == SocketState::TimeWait)
            .expect("time-wait row");
        assert_eq!(time_wait.pid, None);
    }

    #[test]
    fn owners_are_cached_while_socket_lives() {
        let dir = tempfile::tempdir().expect("tempdir");
        let local = format!("{}:C350", hex_v4([192, 168, 1, 5]));
        let other = format!("{}:C351", hex_v4([192, 168, 1, 5]));
        let remote = format!("{}:01BB", hex_v4([93, 184, 216, 34]));
        write_table(dir.path(), "tcp", &[row(&local, &remote, "01", 5555), row(&other, &remote, "01", 7777)]);
        own_socket(dir.path(), 4242, 3, 5555);

        let mut table = ProcNetTable::with_root(dir.path());
        let pid_of = |snapshot: &HashSet<Connection>, port: u16| {
            snapshot
                .iter()
                .find(|c| c.local_port() == port)
                .expect("row")
                .pid
        };
        let first = table.snapshot().expect("snapshot");
        assert_eq!(pid_of(&first, 50000), Some(4242));
        assert_eq!(pid_of(&first, 50001), None);

        // Neither the vanished fd nor the late one triggers a rescan.
        fs::remove_dir_all(dir.path().join("4242")).expect("rm");
        own_socket(dir.path(), 4243, 4, 7777);
        let second = table.snapshot().expect("snapshot");
        assert_eq!(pid_of(&second, 50000), Some(4242));
        assert_eq!(pid_of(&second, 50001), None);

        // Once the inode leaves the table it is resolved afresh.
        write_table(dir.path(), "tcp", &[]);
        assert!(table.snapshot().expect("snapshot").is_empty());
        write_table(dir.path(), "tcp", &[row(&other, &remote, "01", 7777)]);
        let third = table.snapshot().expect("snapshot");
        assert_eq!(pid_of(&third, 50001), Some(4243));
    }

    #[test]
    fn snapshot_skips_missing_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut table = ProcNetTable::with_root(dir.path());
        assert!(table.snapshot().expect("snapshot").is_empty());
    }

    #[test]
    fn snapshot_reads_all_families() {
        let dir = tempfile::tempdir().expect("tempdir");
        let v6: Ipv6Addr = "2606:4700:4700::1111".parse().expect("ip");
        let local6: Ipv6Addr = "2001:470::5".parse().expect("ip");
        write_table(
            dir.path(),
            "udp",
            &[row(
                &format!("{}:D431", hex_v4([10, 0, 0, 2])),
                &format!("{}:0035", hex_v4([1, 1, 1, 1])),
                "01",
                11,
            )],
        );
        write_table(
            dir.path(),
            "tcp6",
            &[row(
                &format!("{}:D432", hex_v6(local6)),
                &format!("{}:01BB", hex_v6(v6)),
                "01",
                12,
            )],
        );
        let mut table = ProcNetTable::with_root(dir.path());
        let snapshot = table.snapshot().expect("snapshot");
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().any(|c| c.protocol == Protocol::Udp));
        assert!(
            snapshot
                .iter()
                .any(|c| c.remote_ip() == Some(IpAddr::V6(v6)))
        );
    }
}
