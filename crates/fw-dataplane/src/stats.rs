//! Lane statistics
//!
//! Lock-free counters, one cache line per lane.

use crate::audit::Verdict;
use crate::parser::ParseDepth;
use fw_common::MatchKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-lane stats (cache-line aligned)
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct LaneStats {
    pub rx_packets: AtomicU64,
    pub rx_bytes: AtomicU64,
    pub admitted: AtomicU64,
    pub discarded: AtomicU64,
    /// Frames shorter than an Ethernet header
    pub truncated: AtomicU64,
    /// Decisions per match kind, indexed by wire value
    pub hits: [AtomicU64; 6],
}

impl LaneStats {
    #[inline(always)]
    pub fn record_rx(&self, bytes: u64) {
        self.rx_packets.fetch_add(1, Ordering::Relaxed);
        self.rx_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_depth(&self, depth: ParseDepth) {
        if depth == ParseDepth::Truncated {
            self.truncated.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline(always)]
    pub fn record_decision(&self, kind: MatchKind, verdict: Verdict) {
        self.hits[kind.index()].fetch_add(1, Ordering::Relaxed);
        match verdict {
            Verdict::Admit => self.admitted.fetch_add(1, Ordering::Relaxed),
            Verdict::Discard => self.discarded.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> LaneStatsSnapshot {
        let mut hits = [0u64; 6];
        for (out, counter) in hits.iter_mut().zip(&self.hits) {
            *out = counter.load(Ordering::Relaxed);
        }
        LaneStatsSnapshot {
            rx_packets: self.rx_packets.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            hits,
        }
    }
}

/// Stats snapshot (non-atomic)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LaneStatsSnapshot {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub admitted: u64,
    pub discarded: u64,
    pub truncated: u64,
    pub hits: [u64; 6],
}

impl LaneStatsSnapshot {
    /// Decisions for one match kind
    pub fn hits_for(&self, kind: MatchKind) -> u64 {
        self.hits[kind.index()]
    }

    pub fn discard_rate(&self) -> f64 {
        if self.rx_packets == 0 { return 0.0; }
        self.discarded as f64 / self.rx_packets as f64
    }

    pub fn packet_rate_mpps(&self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 { return 0.0; }
        self.rx_packets as f64 / (elapsed_secs * 1_000_000.0)
    }

    fn accumulate(&mut self, other: &Self) {
        self.rx_packets += other.rx_packets;
        self.rx_bytes += other.rx_bytes;
        self.admitted += other.admitted;
        self.discarded += other.discarded;
        self.truncated += other.truncated;
        for (a, b) in self.hits.iter_mut().zip(other.hits) {
            *a += b;
        }
    }
}

/// Aggregate stats across all lanes
#[derive(Debug)]
pub struct AggregateStats {
    lanes: Vec<LaneStats>,
}

impl AggregateStats {
    pub fn new(num_lanes: usize) -> Self {
        let mut lanes = Vec::with_capacity(num_lanes);
        lanes.resize_with(num_lanes, LaneStats::default);
        Self { lanes }
    }

    pub fn lane(&self, idx: usize) -> &LaneStats {
        &self.lanes[idx]
    }

    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    pub fn total(&self) -> LaneStatsSnapshot {
        let mut total = LaneStatsSnapshot::default();
        for lane in &self.lanes {
            total.accumulate(&lane.snapshot());
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_stats() {
        let stats = LaneStats::default();
        stats.record_rx(60);
        stats.record_depth(ParseDepth::Transport);
        stats.record_decision(MatchKind::Ipv4Exact, Verdict::Discard);
        stats.record_rx(10);
        stats.record_depth(ParseDepth::Truncated);
        stats.record_decision(MatchKind::Pass, Verdict::Admit);

        let snap = stats.snapshot();
        assert_eq!(snap.rx_packets, 2);
        assert_eq!(snap.rx_bytes, 70);
        assert_eq!(snap.truncated, 1);
        assert_eq!(snap.admitted, 1);
        assert_eq!(snap.discarded, 1);
        assert_eq!(snap.hits_for(MatchKind::Ipv4Exact), 1);
        assert_eq!(snap.hits_for(MatchKind::Pass), 1);
        assert_eq!(snap.discard_rate(), 0.5);
    }

    #[test]
    fn test_aggregate() {
        let agg = AggregateStats::new(4);
        agg.lane(0).record_rx(1000);
        agg.lane(1).record_rx(2000);
        agg.lane(3).record_decision(MatchKind::Mac, Verdict::Discard);

        let total = agg.total();
        assert_eq!(total.rx_packets, 2);
        assert_eq!(total.rx_bytes, 3000);
        assert_eq!(total.hits_for(MatchKind::Mac), 1);
        assert_eq!(agg.num_lanes(), 4);
    }

    #[test]
    fn test_cache_line_aligned() {
        assert_eq!(std::mem::align_of::<LaneStats>(), 64);
    }
}
