//! Audit collector
//!
//! Consumes audit records off the ring and folds them into traffic
//! summaries: totals, per-dimension counters and per-source counters.
//! Runs on the consumer side, never on a lane.
//!
//! Dimensions:
//!
//! | Dimension    | Key                                          |
//! |--------------|----------------------------------------------|
//! | `ether_type` | `ipv4`, `ipv6`, `arp` or `0x....`            |
//! | `ip_proto`   | `tcp`, `udp`, `icmp`, `icmpv6` or the number |
//! | `dst_port`   | port, TCP/UDP only                           |
//! | `match`      | offending source MAC or IP, matches only     |

use crate::audit::AuditRing;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fw_common::packet::{ETH_P_IP, ETH_P_IPV6, IPPROTO_TCP, IPPROTO_UDP};
use fw_common::{AtomicCounter, AuditRecord, MacAddr, MatchKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use tracing::debug;

/// Default bound on tracked sources
pub const DEFAULT_MAX_SOURCES: usize = 65_536;

/// Summary dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Link-layer protocol
    EtherType,
    /// Transport protocol
    IpProto,
    /// Destination port
    DstPort,
    /// Source that hit a rule
    Match,
}

impl Dimension {
    /// Every dimension
    pub const ALL: [Self; 4] = [Self::EtherType, Self::IpProto, Self::DstPort, Self::Match];

    /// Stable name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EtherType => "ether_type",
            Self::IpProto => "ip_proto",
            Self::DstPort => "dst_port",
            Self::Match => "match",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Packet and byte counters with first/last sighting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Traffic {
    pub packets: u64,
    pub bytes: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Traffic {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            packets: 0,
            bytes: 0,
            first_seen: now,
            last_seen: now,
        }
    }

    fn record(&mut self, bytes: u32, now: DateTime<Utc>) {
        self.packets += 1;
        self.bytes += u64::from(bytes);
        self.last_seen = now;
    }
}

/// One row of a dimension summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionEntry {
    pub key: String,
    #[serde(flatten)]
    pub traffic: Traffic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SourceKey {
    mac: MacAddr,
    ip: Option<IpAddr>,
}

/// Traffic seen from one (MAC, IP) source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub src_mac: MacAddr,
    pub src_ip: Option<IpAddr>,
    /// Packets that hit a rule
    pub discarded: u64,
    /// Most recent match, `pass` if never matched
    pub last_match: MatchKind,
    #[serde(flatten)]
    pub traffic: Traffic,
}

/// Serializable snapshot of the collector
#[derive(Debug, Clone, Serialize)]
pub struct CollectorReport {
    pub total_packets: u64,
    pub total_bytes: u64,
    /// Top entries per dimension, busiest first
    pub dimensions: BTreeMap<Dimension, Vec<DimensionEntry>>,
    /// Sources not tracked because the table was full
    pub untracked_sources: u64,
}

/// Aggregates audit records into traffic summaries
#[derive(Debug)]
pub struct AuditCollector {
    total_packets: AtomicCounter,
    total_bytes: AtomicCounter,
    dimensions: DashMap<(Dimension, String), Traffic>,
    sources: DashMap<SourceKey, SourceStats>,
    max_sources: usize,
    untracked: AtomicCounter,
}

impl AuditCollector {
    /// Collector tracking up to [`DEFAULT_MAX_SOURCES`] sources
    pub fn new() -> Self {
        Self::with_max_sources(DEFAULT_MAX_SOURCES)
    }

    /// Collector with an explicit source bound
    pub fn with_max_sources(max_sources: usize) -> Self {
        Self {
            total_packets: AtomicCounter::new(0),
            total_bytes: AtomicCounter::new(0),
            dimensions: DashMap::new(),
            sources: DashMap::new(),
            max_sources,
            untracked: AtomicCounter::new(0),
        }
    }

    /// Fold one record in
    pub fn collect(&self, record: &AuditRecord) {
        self.collect_at(record, Utc::now());
    }

    fn collect_at(&self, record: &AuditRecord, now: DateTime<Utc>) {
        let desc = record.descriptor();
        self.total_packets.inc();
        self.total_bytes.add(u64::from(desc.length));

        if desc.ether_type != 0 {
            self.bump(Dimension::EtherType, ether_type_name(desc.ether_type), desc.length, now);
        }
        if desc.src_ip().is_some() && desc.transport_proto != 0 {
            self.bump(Dimension::IpProto, ip_proto_name(desc.transport_proto), desc.length, now);
        }
        if desc.dst_port > 0 {
            self.bump(Dimension::DstPort, desc.dst_port.to_string(), desc.length, now);
        }

        let kind = record.match_kind();
        if kind.is_match() {
            let offender = match (kind, desc.src_ip()) {
                (MatchKind::Mac, _) | (_, None) => desc.src_mac.to_string(),
                (_, Some(ip)) => ip.to_string(),
            };
            self.bump(Dimension::Match, offender, desc.length, now);
        }

        let key = SourceKey {
            mac: desc.src_mac,
            ip: desc.src_ip(),
        };
        if !self.sources.contains_key(&key) && self.sources.len() >= self.max_sources {
            self.untracked.inc();
            return;
        }
        let mut source = self.sources.entry(key).or_insert_with(|| SourceStats {
            src_mac: key.mac,
            src_ip: key.ip,
            discarded: 0,
            last_match: MatchKind::Pass,
            traffic: Traffic::new(now),
        });
        source.traffic.record(desc.length, now);
        if kind.is_match() {
            source.discarded += 1;
            source.last_match = kind;
        }
    }

    fn bump(&self, dimension: Dimension, key: String, bytes: u32, now: DateTime<Utc>) {
        self.dimensions
            .entry((dimension, key))
            .or_insert_with(|| Traffic::new(now))
            .record(bytes, now);
    }

    /// Pop up to `max` records off `ring` and fold them in
    pub fn drain_from(&self, ring: &AuditRing, max: usize) -> usize {
        let mut drained = 0;
        while drained < max {
            match ring.pop() {
                Some(record) => {
                    self.collect(&record);
                    drained += 1;
                }
                None => break,
            }
        }
        drained
    }

    /// Packets seen
    pub fn total_packets(&self) -> u64 {
        self.total_packets.get()
    }

    /// Bytes seen
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.get()
    }

    /// Counters for one dimension key
    pub fn dimension(&self, dimension: Dimension, key: &str) -> Option<Traffic> {
        self.dimensions
            .get(&(dimension, key.to_string()))
            .map(|t| t.clone())
    }

    /// Report with at most `top` entries per dimension
    pub fn report(&self, top: usize) -> CollectorReport {
        let mut dimensions: BTreeMap<Dimension, Vec<DimensionEntry>> = BTreeMap::new();
        for item in self.dimensions.iter() {
            let (dimension, key) = item.key();
            dimensions.entry(*dimension).or_default().push(DimensionEntry {
                key: key.clone(),
                traffic: item.value().clone(),
            });
        }
        for entries in dimensions.values_mut() {
            entries.sort_by(|a, b| {
                b.traffic
                    .packets
                    .cmp(&a.traffic.packets)
                    .then_with(|| a.key.cmp(&b.key))
            });
            entries.truncate(top);
        }

        CollectorReport {
            total_packets: self.total_packets(),
            total_bytes: self.total_bytes(),
            dimensions,
            untracked_sources: self.untracked.get(),
        }
    }

    /// Busiest sources first
    pub fn top_sources(&self, n: usize) -> Vec<SourceStats> {
        let mut sources: Vec<SourceStats> = self.sources.iter().map(|s| s.value().clone()).collect();
        sources.sort_by(|a, b| b.traffic.packets.cmp(&a.traffic.packets));
        sources.truncate(n);
        sources
    }

    /// Sources currently tracked
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Dimension keys currently tracked
    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    /// Drop dimension keys and sources not seen within `retention`
    ///
    /// Returns how many entries were removed. Totals are kept.
    pub fn cleanup_stale(&self, retention: Duration) -> usize {
        self.cleanup_stale_at(Utc::now(), retention)
    }

    fn cleanup_stale_at(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let cutoff = now - retention;
        let before = self.dimensions.len() + self.sources.len();

        self.dimensions.retain(|_, traffic| traffic.last_seen >= cutoff);
        self.sources.retain(|_, source| source.traffic.last_seen >= cutoff);

        let removed = before.saturating_sub(self.dimensions.len() + self.sources.len());
        if removed > 0 {
            debug!(removed, %cutoff, "stale collector entries dropped");
        }
        removed
    }

    /// Forget everything
    pub fn clear(&self) {
        self.total_packets.take();
        self.total_bytes.take();
        self.untracked.take();
        self.dimensions.clear();
        self.sources.clear();
    }
}

impl Default for AuditCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn ether_type_name(ether_type: u16) -> String {
    match ether_type {
        ETH_P_IP => "ipv4".to_string(),
        ETH_P_IPV6 => "ipv6".to_string(),
        0x0806 => "arp".to_string(),
        other => format!("0x{other:04x}"),
    }
}

fn ip_proto_name(proto: u8) -> String {
    match proto {
        IPPROTO_TCP => "tcp".to_string(),
        IPPROTO_UDP => "udp".to_string(),
        1 => "icmp".to_string(),
        58 => "icmpv6".to_string(),
        other => other.to_string(),
    }
}
