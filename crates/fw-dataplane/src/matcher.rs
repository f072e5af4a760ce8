//! Rule matcher
//!
//! Fixed priority, first hit wins:
//!
//! 1. source MAC exact
//! 2. source IPv4 exact, then IPv4 CIDR (IPv4 frames only)
//! 3. source IPv6 exact, then IPv6 CIDR (IPv6 frames only)
//! 4. `Pass`
//!
//! The IP stages run only when the parser decoded the whole network
//! header. A frame cut inside it leaves a zeroed source address, which
//! must not be compared against the IP tables.
//!
//! Destination addresses are carried in the descriptor but never matched.

use crate::parser::ParseDepth;
use fw_common::{MatchKind, PacketDescriptor};
use fw_rules::RuleTables;

/// Classify one descriptor, decoded to `depth`, against a table snapshot
#[inline]
pub fn match_source(desc: &PacketDescriptor, depth: ParseDepth, tables: &RuleTables) -> MatchKind {
    // too short to carry a source MAC
    if depth == ParseDepth::Truncated {
        return MatchKind::Pass;
    }
    if tables.contains_mac(&desc.src_mac) {
        return MatchKind::Mac;
    }
    if depth < ParseDepth::Network {
        return MatchKind::Pass;
    }

    if desc.is_ipv4() {
        if tables.contains_ipv4(&desc.src_ipv4) {
            return MatchKind::Ipv4Exact;
        }
        if tables.lookup_ipv4_cidr(desc.src_ipv4) {
            return MatchKind::Ipv4Cidr;
        }
    }

    if desc.is_ipv6() {
        if tables.contains_ipv6(&desc.src_ipv6) {
            return MatchKind::Ipv6Exact;
        }
        if tables.lookup_ipv6_cidr(desc.src_ipv6) {
            return MatchKind::Ipv6Cidr;
        }
    }

    MatchKind::Pass
}
