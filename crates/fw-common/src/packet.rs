//! Packet descriptor extracted from a single frame
//!
//! The descriptor is a plain `Copy` value. Every field has a zero default and
//! the parser only ever fills fields in, so a descriptor is always complete
//! even when the frame was cut short.

use crate::{FwError, MatchKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Length of a MAC address
pub const ETH_ALEN: usize = 6;

/// Ether-type for IPv4
pub const ETH_P_IP: u16 = 0x0800;

/// Ether-type for IPv6
pub const ETH_P_IPV6: u16 = 0x86DD;

/// IP protocol number for TCP
pub const IPPROTO_TCP: u8 = 6;

/// IP protocol number for UDP
pub const IPPROTO_UDP: u8 = 17;

/// 48-bit link-layer address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr(pub [u8; ETH_ALEN]);

impl MacAddr {
    /// All-zero address
    pub const ZERO: Self = Self([0; ETH_ALEN]);

    /// Create from raw octets
    #[inline(always)]
    pub const fn new(octets: [u8; ETH_ALEN]) -> Self {
        Self(octets)
    }

    /// Raw octets
    #[inline(always)]
    pub const fn octets(&self) -> [u8; ETH_ALEN] {
        self.0
    }

    /// True for the all-zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0; ETH_ALEN]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = FwError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` and `aabb.ccdd.eeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FwError::InvalidRule(format!("not a MAC address: {s}"));

        let hex: String = if s.contains('.') {
            let groups: Vec<&str> = s.split('.').collect();
            if groups.len() != 3 || groups.iter().any(|g| g.len() != 4) {
                return Err(invalid());
            }
            groups.concat()
        } else {
            let sep = if s.contains('-') { '-' } else { ':' };
            let groups: Vec<&str> = s.split(sep).collect();
            if groups.len() != ETH_ALEN || groups.iter().any(|g| g.len() != 2) {
                return Err(invalid());
            }
            groups.concat()
        };

        let mut octets = [0u8; ETH_ALEN];
        for (i, octet) in octets.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(invalid)?;
            *octet = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = FwError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

impl From<[u8; ETH_ALEN]> for MacAddr {
    fn from(octets: [u8; ETH_ALEN]) -> Self {
        Self(octets)
    }
}

/// Fixed-shape view of one frame
///
/// Produced by the frame parser and completed by the matcher, which sets
/// `match_kind` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketDescriptor {
    /// Source MAC
    pub src_mac: MacAddr,
    /// Destination MAC
    pub dst_mac: MacAddr,
    /// Source IPv4 (network order octets)
    pub src_ipv4: Ipv4Addr,
    /// Destination IPv4
    pub dst_ipv4: Ipv4Addr,
    /// Source IPv6
    pub src_ipv6: Ipv6Addr,
    /// Destination IPv6
    pub dst_ipv6: Ipv6Addr,
    /// Source port (host order, zero unless TCP/UDP)
    pub src_port: u16,
    /// Destination port (host order, zero unless TCP/UDP)
    pub dst_port: u16,
    /// Ether-type (host order)
    pub ether_type: u16,
    /// IPv4 protocol or IPv6 next header
    pub transport_proto: u8,
    /// Frame length in bytes
    pub length: u32,
    /// Classification outcome
    pub match_kind: MatchKind,
}

impl PacketDescriptor {
    /// Descriptor with every field at its zero value
    pub const ZERO: Self = Self {
        src_mac: MacAddr::ZERO,
        dst_mac: MacAddr::ZERO,
        src_ipv4: Ipv4Addr::UNSPECIFIED,
        dst_ipv4: Ipv4Addr::UNSPECIFIED,
        src_ipv6: Ipv6Addr::UNSPECIFIED,
        dst_ipv6: Ipv6Addr::UNSPECIFIED,
        src_port: 0,
        dst_port: 0,
        ether_type: 0,
        transport_proto: 0,
        length: 0,
        match_kind: MatchKind::Pass,
    };

    /// Zero every field in place
    #[inline(always)]
    pub fn reset(&mut self) {
        *self = Self::ZERO;
    }

    /// Ether-type says IPv4
    #[inline(always)]
    pub const fn is_ipv4(&self) -> bool {
        self.ether_type == ETH_P_IP
    }

    /// Ether-type says IPv6
    #[inline(always)]
    pub const fn is_ipv6(&self) -> bool {
        self.ether_type == ETH_P_IPV6
    }

    /// Source address of the family the ether-type declares
    pub fn src_ip(&self) -> Option<IpAddr> {
        match self.ether_type {
            ETH_P_IP => Some(IpAddr::V4(self.src_ipv4)),
            ETH_P_IPV6 => Some(IpAddr::V6(self.src_ipv6)),
            _ => None,
        }
    }

    /// Destination address of the family the ether-type declares
    pub fn dst_ip(&self) -> Option<IpAddr> {
        match self.ether_type {
            ETH_P_IP => Some(IpAddr::V4(self.dst_ipv4)),
            ETH_P_IPV6 => Some(IpAddr::V6(self.dst_ipv6)),
            _ => None,
        }
    }
}

impl Default for PacketDescriptor {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_parse_formats() {
        let expected = MacAddr::new([0xaa, 0xbb, 0xcc, 0x01, 0x02, 0x03]);
        assert_eq!("aa:bb:cc:01:02:03".parse::<MacAddr>().unwrap(), expected);
        assert_eq!("AA-BB-CC-01-02-03".parse::<MacAddr>().unwrap(), expected);
        assert_eq!("aabb.cc01.0203".parse::<MacAddr>().unwrap(), expected);
        assert_eq!(expected.to_string(), "aa:bb:cc:01:02:03");
    }

    #[test]
    fn test_mac_parse_rejects_garbage() {
        assert!("aa:bb:cc:01:02".parse::<MacAddr>().is_err());
        assert!("aa:bb:cc:01:02:zz".parse::<MacAddr>().is_err());
        assert!("10.0.0.1".parse::<MacAddr>().is_err());
        assert!("aabb.cc01".parse::<MacAddr>().is_err());
        assert!("".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_serde_as_string() {
        let mac = MacAddr::new([0, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"00:11:22:33:44:55\"");
        let back: MacAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn test_descriptor_defaults_to_zero() {
        let desc = PacketDescriptor::default();
        assert!(desc.src_mac.is_zero());
        assert_eq!(desc.src_ipv4, Ipv4Addr::UNSPECIFIED);
        assert_eq!(desc.src_ipv6, Ipv6Addr::UNSPECIFIED);
        assert_eq!(desc.match_kind, MatchKind::Pass);
        assert_eq!(desc.src_ip(), None);
    }

    #[test]
    fn test_descriptor_reset() {
        let mut desc = PacketDescriptor {
            ether_type: ETH_P_IP,
            src_ipv4: Ipv4Addr::new(10, 0, 0, 1),
            dst_port: 443,
            match_kind: MatchKind::Ipv4Exact,
            ..Default::default()
        };
        assert_eq!(desc.src_ip(), Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        desc.reset();
        assert_eq!(desc, PacketDescriptor::ZERO);
    }
}
