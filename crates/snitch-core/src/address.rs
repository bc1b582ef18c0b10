//! Public/private classification of IP addresses.
//!
//! An address is *private* when it belongs to a reserved block that is not
//! globally routable: loopback, link-local, private-use, documentation,
//! benchmarking, and the other IANA special-purpose ranges. Everything
//! else is *public*, and only public peers are of interest to the monitor.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Returns `true` if `ip` lies in a non-globally-routable range.
///
/// IPv4-mapped IPv6 addresses are classified as their IPv4 counterpart.
#[must_use]
pub fn is_private(ip: IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

/// Returns `true` if `ip` is globally routable.
#[must_use]
pub fn is_public(ip: IpAddr) -> bool {
    !is_private(ip)
}

/// Collapses IPv4-mapped IPv6 addresses into plain IPv4.
///
/// Dual-stack sockets report IPv4 peers as `::ffff:a.b.c.d`; recording the
/// canonical form keeps one spelling per remote host.
#[must_use]
pub const fn canonical(ip: IpAddr) -> IpAddr {
    ip.to_canonical()
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, c, d] = ip.octets();
    match a {
        0 | 10 | 127 => true,
        169 => b == 254,
        172 => b & 0xf0 == 16,
        192 => {
            (b == 0 && c == 0 && (d < 8 || d == 170 || d == 171))
                || (b == 0 && c == 2)
                || b == 168
        }
        198 => b & 0xfe == 18 || (b == 51 && c == 100),
        203 => b == 0 && c == 113,
        240..=255 => true,
        _ => false,
    }
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if ip.is_unspecified() || ip.is_loopback() {
        return true;
    }
    let s = ip.segments();
    // ::ffff:0:0/96 that did not canonicalize (never for valid mapped input)
    if s[..5] == [0, 0, 0, 0, 0] && s[5] == 0xffff {
        return true;
    }
    // 100::/64 discard-only
    if s[0] == 0x0100 && s[1..4] == [0, 0, 0] {
        return true;
    }
    // 2001::/23 IETF protocol assignments, 2001:db8::/32 documentation
    if s[0] == 0x2001 && (s[1] < 0x0200 || s[1] == 0x0db8) {
        return true;
    }
    // fc00::/7 unique local, fe80::/10 link-local
    s[0] & 0xfe00 == 0xfc00 || s[0] & 0xffc0 == 0xfe80
}
