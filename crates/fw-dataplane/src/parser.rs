//! Frame parser
//!
//! Fills a [`PacketDescriptor`] from a raw Ethernet-II frame:
//!
//! ```text
//! | Ethernet (14) | IPv4 fixed (20) / IPv6 fixed (40) | TCP/UDP ports (4) | ...
//! ```
//!
//! Every read is preceded by a length check against the remaining bytes.
//! A layer that does not fit is skipped and its fields stay zero; nothing
//! past the first four transport bytes is inspected. IPv4 options and IPv6
//! extension headers are not walked.

use fw_common::packet::{ETH_ALEN, ETH_P_IP, ETH_P_IPV6, IPPROTO_TCP, IPPROTO_UDP};
use fw_common::{MacAddr, PacketDescriptor};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Ethernet-II header length
pub const ETH_HLEN: usize = 14;

/// IPv4 header without options
pub const IPV4_HLEN: usize = 20;

/// IPv6 fixed header
pub const IPV6_HLEN: usize = 40;

/// Source and destination port
pub const PORTS_LEN: usize = 4;

/// Deepest layer the parser decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParseDepth {
    /// Shorter than an Ethernet header; only the length is known
    Truncated,
    /// Ethernet header only
    Link,
    /// Ethernet plus IPv4/IPv6 fixed header
    Network,
    /// Transport ports as well
    Transport,
}

/// Parse `frame` into `desc`
///
/// `desc` is expected to be zeroed; only fields that fit in the frame are
/// written.
#[inline]
pub fn parse_into(frame: &[u8], desc: &mut PacketDescriptor) -> ParseDepth {
    desc.length = u32::try_from(frame.len()).unwrap_or(u32::MAX);

    let Some(eth) = frame.get(..ETH_HLEN) else {
        return ParseDepth::Truncated;
    };
    desc.dst_mac = MacAddr(read_array::<ETH_ALEN>(eth, 0));
    desc.src_mac = MacAddr(read_array::<ETH_ALEN>(eth, ETH_ALEN));
    desc.ether_type = u16::from_be_bytes(read_array(eth, 12));

    let l3 = &frame[ETH_HLEN..];
    let rest = match desc.ether_type {
        ETH_P_IP => match l3.get(..IPV4_HLEN) {
            Some(ip) => {
                desc.transport_proto = ip[9];
                desc.src_ipv4 = Ipv4Addr::from(read_array::<4>(ip, 12));
                desc.dst_ipv4 = Ipv4Addr::from(read_array::<4>(ip, 16));
                &l3[IPV4_HLEN..]
            }
            None => return ParseDepth::Link,
        },
        ETH_P_IPV6 => match l3.get(..IPV6_HLEN) {
            Some(ip) => {
                desc.transport_proto = ip[6];
                desc.src_ipv6 = Ipv6Addr::from(read_array::<16>(ip, 8));
                desc.dst_ipv6 = Ipv6Addr::from(read_array::<16>(ip, 24));
                &l3[IPV6_HLEN..]
            }
            None => return ParseDepth::Link,
        },
        _ => return ParseDepth::Link,
    };

    if !matches!(desc.transport_proto, IPPROTO_TCP | IPPROTO_UDP) {
        return ParseDepth::Network;
    }
    match rest.get(..PORTS_LEN) {
        Some(ports) => {
            desc.src_port = u16::from_be_bytes(read_array(ports, 0));
            desc.dst_port = u16::from_be_bytes(read_array(ports, 2));
            ParseDepth::Transport
        }
        None => ParseDepth::Network,
    }
}

/// Parse into a fresh descriptor
pub fn parse(frame: &[u8]) -> (PacketDescriptor, ParseDepth) {
    let mut desc = PacketDescriptor::ZERO;
    let depth = parse_into(frame, &mut desc);
    (desc, depth)
}

/// Copy `N` bytes at `offset`; callers have already bounds-checked `buf`
#[inline(always)]
fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    if let Some(src) = buf.get(offset..offset + N) {
        out.copy_from_slice(src);
    }
    out
}

/// Frame builders shared by tests and benches
#[doc(hidden)]
pub mod build {
    use super::*;

    /// Ethernet header
    pub fn eth(src: [u8; 6], dst: [u8; 6], ether_type: u16) -> Vec<u8> {
        let mut f = Vec::with_capacity(64);
        f.extend_from_slice(&dst);
        f.extend_from_slice(&src);
        f.extend_from_slice(&ether_type.to_be_bytes());
        f
    }

    /// Ethernet + IPv4 + first transport bytes
    pub fn ipv4(src_mac: [u8; 6], src: Ipv4Addr, dst: Ipv4Addr, proto: u8, sport: u16, dport: u16) -> Vec<u8> {
        let mut f = eth(src_mac, [0x02, 0, 0, 0, 0, 0xfe], ETH_P_IP);
        let mut ip = [0u8; IPV4_HLEN];
        ip[0] = 0x45;
        ip[8] = 64;
        ip[9] = proto;
        ip[12..16].copy_from_slice(&src.octets());
        ip[16..20].copy_from_slice(&dst.octets());
        f.extend_from_slice(&ip);
        f.extend_from_slice(&sport.to_be_bytes());
        f.extend_from_slice(&dport.to_be_bytes());
        // rest of a minimal TCP header
        f.extend_from_slice(&[0u8; 16]);
        f
    }

    /// Ethernet + IPv6 + first transport bytes
    pub fn ipv6(src_mac: [u8; 6], src: Ipv6Addr, dst: Ipv6Addr, next: u8, sport: u16, dport: u16) -> Vec<u8> {
        let mut f = eth(src_mac, [0x02, 0, 0, 0, 0, 0xfe], ETH_P_IPV6);
        let mut ip = [0u8; IPV6_HLEN];
        ip[0] = 0x60;
        ip[6] = next;
        ip[7] = 64;
        ip[8..24].copy_from_slice(&src.octets());
        ip[24..40].copy_from_slice(&dst.octets());
        f.extend_from_slice(&ip);
        f.extend_from_slice(&sport.to_be_bytes());
        f.extend_from_slice(&dport.to_be_bytes());
        f.extend_from_slice(&[0u8; 4]);
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];

    #[test]
    fn test_parse_ipv4_tcp() {
        let frame = build::ipv4(
            MAC,
            Ipv4Addr::new(192, 168, 1, 5),
            Ipv4Addr::new(10, 0, 0, 1),
            IPPROTO_TCP,
            12345,
            443,
        );
        let (desc, depth) = parse(&frame);

        assert_eq!(depth, ParseDepth::Transport);
        assert_eq!(desc.src_mac, MacAddr(MAC));
        assert_eq!(desc.dst_mac, MacAddr([0x02, 0, 0, 0, 0, 0xfe]));
        assert_eq!(desc.ether_type, ETH_P_IP);
        assert_eq!(desc.src_ipv4, Ipv4Addr::new(192, 168, 1, 5));
        assert_eq!(desc.dst_ipv4, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(desc.transport_proto, IPPROTO_TCP);
        assert_eq!((desc.src_port, desc.dst_port), (12345, 443));
        assert_eq!(desc.length as usize, frame.len());
        assert_eq!(desc.src_ipv6, Ipv6Addr::UNSPECIFIED);
    }

    #[test]
    fn test_parse_ipv6_udp() {
        let src: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let dst: Ipv6Addr = "2001:db8::2".parse().unwrap();
        let (desc, depth) = parse(&build::ipv6(MAC, src, dst, IPPROTO_UDP, 5353, 53));

        assert_eq!(depth, ParseDepth::Transport);
        assert_eq!(desc.src_ipv6, src);
        assert_eq!(desc.dst_ipv6, dst);
        assert_eq!(desc.transport_proto, IPPROTO_UDP);
        assert_eq!((desc.src_port, desc.dst_port), (5353, 53));
        assert_eq!(desc.src_ipv4, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_short_frame_keeps_only_length() {
        let frame = [0xffu8; ETH_HLEN - 1];
        let (desc, depth) = parse(&frame);
        assert_eq!(depth, ParseDepth::Truncated);
        assert_eq!(desc.length, 13);
        assert!(desc.src_mac.is_zero());
        assert_eq!(desc.ether_type, 0);

        let (desc, depth) = parse(&[]);
        assert_eq!(depth, ParseDepth::Truncated);
        assert_eq!(desc, PacketDescriptor::ZERO);
    }

    #[test]
    fn test_truncated_network_header() {
        let full = build::ipv4(MAC, Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8), IPPROTO_TCP, 1, 2);
        let (desc, depth) = parse(&full[..ETH_HLEN + IPV4_HLEN - 1]);

        assert_eq!(depth, ParseDepth::Link);
        assert_eq!(desc.src_mac, MacAddr(MAC));
        assert_eq!(desc.ether_type, ETH_P_IP);
        assert_eq!(desc.src_ipv4, Ipv4Addr::UNSPECIFIED);
        assert_eq!(desc.transport_proto, 0);
        assert_eq!(desc.dst_port, 0);
    }

    #[test]
    fn test_truncated_transport_header() {
        let full = build::ipv4(MAC, Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8), IPPROTO_UDP, 1, 2);
        let (desc, depth) = parse(&full[..ETH_HLEN + IPV4_HLEN + 3]);

        assert_eq!(depth, ParseDepth::Network);
        assert_eq!(desc.src_ipv4, Ipv4Addr::new(1, 2, 3, 4));
        assert_eq!(desc.transport_proto, IPPROTO_UDP);
        assert_eq!((desc.src_port, desc.dst_port), (0, 0));

        // exactly four bytes is enough
        let (desc, depth) = parse(&full[..ETH_HLEN + IPV4_HLEN + PORTS_LEN]);
        assert_eq!(depth, ParseDepth::Transport);
        assert_eq!((desc.src_port, desc.dst_port), (1, 2));
    }

    #[test]
    fn test_other_protocols_leave_ports_zero() {
        // ICMP
        let frame = build::ipv4(MAC, Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8), 1, 0x0800, 0x1234);
        let (desc, depth) = parse(&frame);
        assert_eq!(depth, ParseDepth::Network);
        assert_eq!(desc.transport_proto, 1);
        assert_eq!((desc.src_port, desc.dst_port), (0, 0));

        // ARP
        let mut frame = build::eth(MAC, [0xff; 6], 0x0806);
        frame.extend_from_slice(&[0u8; 28]);
        let (desc, depth) = parse(&frame);
        assert_eq!(depth, ParseDepth::Link);
        assert_eq!(desc.ether_type, 0x0806);
        assert_eq!(desc.src_mac, MacAddr(MAC));
    }

    #[test]
    fn test_ihl_is_ignored() {
        let mut frame = build::ipv4(MAC, Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8), IPPROTO_TCP, 80, 8080);
        // claim 24-byte header with options
        frame[ETH_HLEN] = 0x46;
        let (desc, _) = parse(&frame);
        assert_eq!((desc.src_port, desc.dst_port), (80, 8080));
    }

    proptest! {
        #[test]
        fn prop_parser_never_panics(frame in proptest::collection::vec(any::<u8>(), 0..128)) {
            let mut desc = PacketDescriptor::ZERO;
            let depth = parse_into(&frame, &mut desc);
            prop_assert_eq!(desc.length as usize, frame.len());
            if frame.len() < ETH_HLEN {
                prop_assert_eq!(depth, ParseDepth::Truncated);
            }
            if depth < ParseDepth::Transport {
                prop_assert_eq!((desc.src_port, desc.dst_port), (0, 0));
            }
        }

        #[test]
        fn prop_ipv4_prefixes_never_panic(cut in 0usize..58, proto in prop_oneof![Just(6u8), Just(17u8), any::<u8>()]) {
            let frame = build::ipv4(MAC, Ipv4Addr::new(9, 9, 9, 9), Ipv4Addr::new(8, 8, 8, 8), proto, 7, 9);
            let (_, depth) = parse(&frame[..cut.min(frame.len())]);
            prop_assert!(depth <= ParseDepth::Transport);
        }
    }
}
