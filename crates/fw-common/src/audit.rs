//! Audit record wire layout
//!
//! ```text
//!  0      4      8               24              40   42   44     50     56   58   60     64     68
//!  +------+------+---------------+---------------+----+----+------+------+----+----+------+------+
//!  |src v4|dst v4|   src IPv6    |   dst IPv6    |sprt|dprt|src MAC|dstMAC|eth |prot| len  | kind |
//!  +------+------+---------------+---------------+----+----+------+------+----+----+------+------+
//! ```
//!
//! Addresses are raw network-order octets; every integer field is
//! little-endian. The layout is densely packed and is a compatibility
//! contract with consumers of the audit stream.

use crate::{FwError, FwResult, MacAddr, PacketDescriptor};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Size of an encoded audit record
pub const AUDIT_RECORD_LEN: usize = 68;

/// Which rule table decided the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum MatchKind {
    /// No rule matched
    #[default]
    Pass = 0,
    /// Source IPv4 exact match
    Ipv4Exact = 1,
    /// Source IPv4 covered by a CIDR block
    Ipv4Cidr = 2,
    /// Source IPv6 exact match
    Ipv6Exact = 3,
    /// Source IPv6 covered by a CIDR block
    Ipv6Cidr = 4,
    /// Source MAC exact match
    Mac = 5,
}

impl MatchKind {
    /// Every kind, indexed by wire value
    pub const ALL: [Self; 6] = [
        Self::Pass,
        Self::Ipv4Exact,
        Self::Ipv4Cidr,
        Self::Ipv6Exact,
        Self::Ipv6Cidr,
        Self::Mac,
    ];

    /// Wire value
    #[inline(always)]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Position in [`MatchKind::ALL`]
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decode a wire value
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Pass),
            1 => Some(Self::Ipv4Exact),
            2 => Some(Self::Ipv4Cidr),
            3 => Some(Self::Ipv6Exact),
            4 => Some(Self::Ipv6Cidr),
            5 => Some(Self::Mac),
            _ => None,
        }
    }

    /// Anything other than `Pass`
    #[inline(always)]
    pub const fn is_match(self) -> bool {
        !matches!(self, Self::Pass)
    }

    /// Stable name used in logs and summaries
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Ipv4Exact => "ipv4_exact",
            Self::Ipv4Cidr => "ipv4_cidr",
            Self::Ipv6Exact => "ipv6_exact",
            Self::Ipv6Cidr => "ipv6_cidr",
            Self::Mac => "mac",
        }
    }
}

impl TryFrom<u32> for MatchKind {
    type Error = FwError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_u32(value).ok_or(FwError::UnknownMatchKind(value))
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable per-packet report handed to the audit sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditRecord {
    descriptor: PacketDescriptor,
}

impl AuditRecord {
    /// Freeze a fully classified descriptor
    #[inline(always)]
    pub const fn new(descriptor: PacketDescriptor) -> Self {
        Self { descriptor }
    }

    /// Recorded descriptor
    #[inline(always)]
    pub const fn descriptor(&self) -> &PacketDescriptor {
        &self.descriptor
    }

    /// Recorded outcome
    #[inline(always)]
    pub const fn match_kind(&self) -> MatchKind {
        self.descriptor.match_kind
    }

    /// Write the 68-byte wire form
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        let d = &self.descriptor;
        buf.put_slice(&d.src_ipv4.octets());
        buf.put_slice(&d.dst_ipv4.octets());
        buf.put_slice(&d.src_ipv6.octets());
        buf.put_slice(&d.dst_ipv6.octets());
        buf.put_u16_le(d.src_port);
        buf.put_u16_le(d.dst_port);
        buf.put_slice(&d.src_mac.octets());
        buf.put_slice(&d.dst_mac.octets());
        buf.put_u16_le(d.ether_type);
        buf.put_u16_le(u16::from(d.transport_proto));
        buf.put_u32_le(d.length);
        buf.put_u32_le(d.match_kind.as_u32());
    }

    /// Encode into a fixed array
    pub fn to_bytes(&self) -> [u8; AUDIT_RECORD_LEN] {
        let mut out = [0u8; AUDIT_RECORD_LEN];
        self.encode(&mut &mut out[..]);
        out
    }

    /// Read one record from the front of `buf`
    pub fn decode<B: Buf>(buf: &mut B) -> FwResult<Self> {
        if buf.remaining() < AUDIT_RECORD_LEN {
            return Err(FwError::Truncated {
                needed: AUDIT_RECORD_LEN,
                got: buf.remaining(),
            });
        }

        let mut v4 = [0u8; 4];
        let mut v6 = [0u8; 16];
        let mut mac = [0u8; 6];
        let mut d = PacketDescriptor::ZERO;

        buf.copy_to_slice(&mut v4);
        d.src_ipv4 = Ipv4Addr::from(v4);
        buf.copy_to_slice(&mut v4);
        d.dst_ipv4 = Ipv4Addr::from(v4);
        buf.copy_to_slice(&mut v6);
        d.src_ipv6 = Ipv6Addr::from(v6);
        buf.copy_to_slice(&mut v6);
        d.dst_ipv6 = Ipv6Addr::from(v6);
        d.src_port = buf.get_u16_le();
        d.dst_port = buf.get_u16_le();
        buf.copy_to_slice(&mut mac);
        d.src_mac = MacAddr(mac);
        buf.copy_to_slice(&mut mac);
        d.dst_mac = MacAddr(mac);
        d.ether_type = buf.get_u16_le();
        // widened on the wire, only the low byte carries data
        d.transport_proto = buf.get_u16_le() as u8;
        d.length = buf.get_u32_le();
        d.match_kind = MatchKind::try_from(buf.get_u32_le())?;

        Ok(Self { descriptor: d })
    }
}

impl From<PacketDescriptor> for AuditRecord {
    fn from(descriptor: PacketDescriptor) -> Self {
        Self::new(descriptor)
    }
}
