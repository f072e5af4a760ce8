//! OpenSASE Frame Firewall - shared types
//!
//! Value types exchanged between the rule store, the data plane and
//! whatever consumes the audit stream:
//!
//! - [`MacAddr`] and [`PacketDescriptor`]: the fixed-shape view of one frame
//! - [`MatchKind`] and [`AuditRecord`]: the per-packet outcome and its
//!   68-byte wire layout
//! - [`Table`]: the five rule tables
//! - [`FwError`]: control-plane errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod error;
pub mod packet;

pub use audit::{AuditRecord, MatchKind, AUDIT_RECORD_LEN};
pub use error::{FwError, FwResult};
pub use packet::{MacAddr, PacketDescriptor};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default number of entries per rule table
pub const DEFAULT_TABLE_CAPACITY: usize = 1024;

/// Full-length IPv4 prefix used for trie lookups
pub const IPV4_FULL_PREFIX: u8 = 32;

/// Full-length IPv6 prefix used for trie lookups
pub const IPV6_FULL_PREFIX: u8 = 128;

/// Rule table selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Source MAC exact match
    Mac,
    /// Source IPv4 exact match
    Ipv4Exact,
    /// Source IPv4 longest-prefix match
    Ipv4Cidr,
    /// Source IPv6 exact match
    Ipv6Exact,
    /// Source IPv6 longest-prefix match
    Ipv6Cidr,
}

impl Table {
    /// All tables in matcher priority order
    pub const ALL: [Self; 5] = [
        Self::Mac,
        Self::Ipv4Exact,
        Self::Ipv4Cidr,
        Self::Ipv6Exact,
        Self::Ipv6Cidr,
    ];

    /// Stable name used in logs and errors
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mac => "mac",
            Self::Ipv4Exact => "ipv4_exact",
            Self::Ipv4Cidr => "ipv4_cidr",
            Self::Ipv6Exact => "ipv6_exact",
            Self::Ipv6Cidr => "ipv6_cidr",
        }
    }

    /// Match kind reported when a packet hits this table
    pub const fn match_kind(&self) -> MatchKind {
        match self {
            Self::Mac => MatchKind::Mac,
            Self::Ipv4Exact => MatchKind::Ipv4Exact,
            Self::Ipv4Cidr => MatchKind::Ipv4Cidr,
            Self::Ipv6Exact => MatchKind::Ipv6Exact,
            Self::Ipv6Cidr => MatchKind::Ipv6Cidr,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relaxed atomic counter for hot-path bookkeeping
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create new counter
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Increment and return previous value
    #[inline(always)]
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Add value and return previous
    #[inline(always)]
    pub fn add(&self, val: u64) -> u64 {
        self.0.fetch_add(val, Ordering::Relaxed)
    }

    /// Get current value
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Reset to zero, returning the value it held
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}
