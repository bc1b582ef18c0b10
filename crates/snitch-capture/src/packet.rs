//! Network-layer packet parsing and boundary classification.
//!
//! Input buffers start at the IP header (cooked capture), so no link-layer
//! framing is handled here.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use snitch_common::types::{CaptureCandidate, Direction, Protocol};
use snitch_core::address::{canonical, is_private};

const IPV4_MIN_HEADER: usize = 20;
const IPV6_HEADER: usize = 40;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;

/// Addressing fields of a captured TCP or UDP packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Transport protocol.
    pub protocol: Protocol,
    /// Source address.
    pub src: IpAddr,
    /// Source port.
    pub src_port: u16,
    /// Destination address.
    pub dst: IpAddr,
    /// Destination port.
    pub dst_port: u16,
}

/// Parses the IP and transport headers of a packet.
///
/// Returns `None` for truncated packets, non-first fragments, and
/// protocols other than TCP and UDP.
#[must_use]
pub fn parse_packet(data: &[u8]) -> Option<PacketHeader> {
    match data.first()? >> 4 {
        4 => parse_ipv4(data),
        6 => parse_ipv6(data),
        _ => None,
    }
}

fn parse_ipv4(data: &[u8]) -> Option<PacketHeader> {
    if data.len() < IPV4_MIN_HEADER {
        return None;
    }
    let ihl = usize::from(data[0] & 0x0f) * 4;
    if ihl < IPV4_MIN_HEADER {
        return None;
    }
    let fragment_offset = u16::from_be_bytes([data[6] & 0x1f, data[7]]);
    if fragment_offset != 0 {
        return None;
    }
    let src = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
    let dst = Ipv4Addr::new(data[16], data[17], data[18], data[19]);
    transport(data, ihl, data[9], IpAddr::V4(src), IpAddr::V4(dst))
}

fn parse_ipv6(data: &[u8]) -> Option<PacketHeader> {
    if data.len() < IPV6_HEADER {
        return None;
    }
    let mut src = [0u8; 16];
    let mut dst = [0u8; 16];
    src.copy_from_slice(&data[8..24]);
    dst.copy_from_slice(&data[24..40]);
    transport(
        data,
        IPV6_HEADER,
        data[6],
        canonical(IpAddr::V6(Ipv6Addr::from(src))),
        canonical(IpAddr::V6(Ipv6Addr::from(dst))),
    )
}

fn transport(data: &[u8], offset: usize, proto: u8, src: IpAddr, dst: IpAddr) -> Option<PacketHeader> {
    let protocol = match proto {
        IPPROTO_TCP => Protocol::Tcp,
        IPPROTO_UDP => Protocol::Udp,
        _ => return None,
    };
    let ports = data.get(offset..offset + 4)?;
    Some(PacketHeader {
        protocol,
        src,
        src_port: u16::from_be_bytes([ports[0], ports[1]]),
        dst,
        dst_port: u16::from_be_bytes([ports[2], ports[3]]),
    })
}

/// Classifies a packet relative to the private/public boundary.
///
/// Packets from a private source to a public destination are outgoing,
/// packets from a public source to a private destination incoming. Flows
/// entirely on one side of the boundary yield `None`.
#[must_use]
pub fn classify(header: &PacketHeader) -> Option<CaptureCandidate> {
    match (is_private(header.src), is_private(header.dst)) {
        (true, false) => Some(CaptureCandidate {
            laddr_ip: header.src,
            laddr_port: header.src_port,
            raddr_ip: header.dst,
            direction: Direction::Outgoing,
        }),
        (false, true) => Some(CaptureCandidate {
            laddr_ip: header.dst,
            laddr_port: header.dst_port,
            raddr_ip: header.src,
            direction: Direction::Incoming,
        }),
        _ => None,
    }
}

/// Parses and classifies a raw packet in one step.
#[must_use]
pub fn candidate_from_packet(data: &[u8]) -> Option<CaptureCandidate> {
    classify(&parse_packet(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_packet(proto: u8, src: [u8; 4], sport: u16, dst: [u8; 4], dport: u16) -> Vec<u8> {
        let mut p = vec![0u8; 28];
        p[0] = 0x45;
        p[9] = proto;
        p[12..16].copy_from_slice(&src);
        p[16..20].copy_from_slice(&dst);
        p[20..22].copy_from_slice(&sport.to_be_bytes());
        p[22..24].copy_from_slice(&dport.to_be_bytes());
        p
    }

    fn ipv6_packet(proto: u8, src: Ipv6Addr, sport: u16, dst: Ipv6Addr, dport: u16) -> Vec<u8> {
        let mut p = vec![0u8; 48];
        p[0] = 0x60;
        p[6] = proto;
        p[8..24].copy_from_slice(&src.octets());
        p[24..40].copy_from_slice(&dst.octets());
        p[40..42].copy_from_slice(&sport.to_be_bytes());
        p[42..44].copy_from_slice(&dport.to_be_bytes());
        p
    }

    #[test]
    fn outgoing_tcp_packet_is_classified() {
        let packet = ipv4_packet(IPPROTO_TCP, [192, 168, 1, 5], 50000, [93, 184, 216, 34], 443);
        let candidate = candidate_from_packet(&packet).expect("candidate");
        assert_eq!(candidate.direction, Direction::Outgoing);
        assert_eq!(candidate.laddr_port, 50000);
        assert_eq!(candidate.raddr_ip, "93.184.216.34".parse::<IpAddr>().expect("ip"));
    }

    #[test]
    fn incoming_udp_packet_uses_destination_as_local() {
        let packet = ipv4_packet(IPPROTO_UDP, [8, 8, 8, 8], 53, [10, 0, 0, 2], 41000);
        let candidate = candidate_from_packet(&packet).expect("candidate");
        assert_eq!(candidate.direction, Direction::Incoming);
        assert_eq!(candidate.laddr_ip, "10.0.0.2".parse::<IpAddr>().expect("ip"));
        assert_eq!(candidate.laddr_port, 41000);
        assert_eq!(candidate.raddr_ip, "8.8.8.8".parse::<IpAddr>().expect("ip"));
    }

    #[test]
    fn same_side_flows_are_dropped() {
        let local = ipv4_packet(IPPROTO_TCP, [127, 0, 0, 1], 1, [192, 168, 0, 1], 2);
        let public = ipv4_packet(IPPROTO_TCP, [1, 1, 1, 1], 1, [8, 8, 8, 8], 2);
        assert!(candidate_from_packet(&local).is_none());
        assert!(candidate_from_packet(&public).is_none());
    }

    #[test]
    fn non_transport_packets_are_dropped() {
        let icmp = ipv4_packet(1, [192, 168, 1, 5], 0, [8, 8, 8, 8], 0);
        assert!(parse_packet(&icmp).is_none());
    }

    #[test]
    fn truncated_packets_are_dropped() {
        let packet = ipv4_packet(IPPROTO_TCP, [192, 168, 1, 5], 1, [8, 8, 8, 8], 2);
        assert!(parse_packet(&packet[..22]).is_none());
        assert!(parse_packet(&[]).is_none());
    }

    #[test]
    fn later_fragments_are_dropped() {
        let mut packet = ipv4_packet(IPPROTO_UDP, [192, 168, 1, 5], 1, [8, 8, 8, 8], 2);
        packet[7] = 0x10;
        assert!(parse_packet(&packet).is_none());
    }

    #[test]
    fn ipv6_packet_is_parsed() {
        let src: Ipv6Addr = "fd00::2".parse().expect("ip");
        let dst: Ipv6Addr = "2606:4700:4700::1111".parse().expect("ip");
        let packet = ipv6_packet(IPPROTO_TCP, src, 40001, dst, 443);
        let header = parse_packet(&packet).expect("header");
        assert_eq!(header.protocol, Protocol::Tcp);
        assert_eq!(header.src_port, 40001);
        let candidate = classify(&header).expect("candidate");
        assert_eq!(candidate.direction, Direction::Outgoing);
        assert_eq!(candidate.raddr_ip, IpAddr::V6(dst));
    }
}
