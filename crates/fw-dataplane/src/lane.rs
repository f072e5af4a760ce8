//! Processing lane
//!
//! A lane is one run-to-completion context: parse, match, decide, audit.
//! It owns a scratch descriptor that is zeroed at the start of every frame,
//! so nothing from a previous frame can leak into the next one. Metric
//! handles are registered when the lane is built, so the packet path never
//! allocates.

use crate::audit::{AuditEmitter, Verdict};
use crate::matcher::match_source;
use crate::parser::parse_into;
use crate::stats::AggregateStats;
use fw_common::{AuditRecord, MatchKind, PacketDescriptor};
use fw_rules::RuleStore;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Counter of verdicts, labelled `verdict`
pub const VERDICTS_METRIC: &str = "fw_verdicts_total";

/// Outcome of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Admit or discard
    pub verdict: Verdict,
    /// Table that decided, `Pass` if none
    pub match_kind: MatchKind,
    /// Audit record reached the sink
    pub audited: bool,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            verdict: Verdict::Admit,
            match_kind: MatchKind::Pass,
            audited: false,
        }
    }
}

/// Single-threaded classification context
pub struct Lane {
    id: usize,
    store: Arc<RuleStore>,
    audit: AuditEmitter,
    stats: Arc<AggregateStats>,
    scratch: PacketDescriptor,
    admitted_total: metrics::Counter,
    discarded_total: metrics::Counter,
}

impl Lane {
    /// Lane `id` reporting into `stats.lane(id)`
    pub fn new(id: usize, store: Arc<RuleStore>, audit: AuditEmitter, stats: Arc<AggregateStats>) -> Self {
        tracing::debug!(lane = id, "lane created");
        Self {
            id,
            store,
            audit,
            stats,
            scratch: PacketDescriptor::ZERO,
            admitted_total: metrics::counter!(VERDICTS_METRIC, "verdict" => Verdict::Admit.as_str()),
            discarded_total: metrics::counter!(VERDICTS_METRIC, "verdict" => Verdict::Discard.as_str()),
        }
    }

    /// Lane index
    pub fn id(&self) -> usize {
        self.id
    }

    /// Classify one frame
    #[inline]
    pub fn classify(&mut self, frame: &[u8]) -> Classification {
        let stats = self.stats.lane(self.id);
        stats.record_rx(frame.len() as u64);

        self.scratch.reset();
        let depth = parse_into(frame, &mut self.scratch);
        stats.record_depth(depth);

        let kind = match_source(&self.scratch, depth, &self.store.snapshot());
        self.scratch.match_kind = kind;

        let verdict = Verdict::from(kind);
        stats.record_decision(kind, verdict);
        match verdict {
            Verdict::Admit => self.admitted_total.increment(1),
            Verdict::Discard => self.discarded_total.increment(1),
        }

        let audited = self.audit.emit(AuditRecord::new(self.scratch));
        Classification {
            verdict,
            match_kind: kind,
            audited,
        }
    }

    /// Descriptor of the most recent frame
    pub fn last_descriptor(&self) -> &PacketDescriptor {
        &self.scratch
    }
}

impl fmt::Debug for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lane")
            .field("id", &self.id)
            .field("audit", &self.audit)
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditRing;
    use crate::parser::build;
    use fw_common::packet::IPPROTO_TCP;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn lane(store: Arc<RuleStore>, ring: Arc<AuditRing>) -> Lane {
        Lane::new(0, store, AuditEmitter::new(ring), Arc::new(AggregateStats::new(1)))
    }

    #[test]
    fn test_scratch_is_reset_between_frames() {
        let store = Arc::new(RuleStore::new());
        let ring = Arc::new(AuditRing::new(8));
        let mut lane = lane(store, ring.clone());

        let frame = build::ipv4(
            [2, 0, 0, 0, 0, 1],
            Ipv4Addr::new(1, 2, 3, 4),
            Ipv4Addr::new(5, 6, 7, 8),
            IPPROTO_TCP,
            1000,
            80,
        );
        lane.classify(&frame);
        assert_eq!(lane.last_descriptor().dst_port, 80);

        // shorter frame must not inherit anything from the previous one
        let out = lane.classify(&frame[..20]);
        assert_eq!(out.verdict, Verdict::Admit);
        let desc = lane.last_descriptor();
        assert_eq!(desc.length, 20);
        assert_eq!(desc.src_ipv4, Ipv4Addr::UNSPECIFIED);
        assert_eq!(desc.dst_port, 0);

        ring.pop().unwrap();
        let second = ring.pop().unwrap();
        assert_eq!(*second.descriptor(), *lane.last_descriptor());
    }

    #[test]
    fn test_short_frame_skips_matching() {
        let store = Arc::new(RuleStore::new());
        // would match a zeroed source MAC if matching ran
        store.add_rule("00:00:00:00:00:00").unwrap();
        let ring = Arc::new(AuditRing::new(8));
        let mut lane = lane(store, ring.clone());

        let out = lane.classify(&[0u8; 10]);
        assert_eq!(out.verdict, Verdict::Admit);
        assert_eq!(out.match_kind, MatchKind::Pass);
        assert!(out.audited);

        let record = ring.pop().unwrap();
        assert_eq!(record.descriptor().length, 10);
        assert_eq!(record.match_kind(), MatchKind::Pass);
    }

    #[test]
    fn test_cut_ip_header_admits_unlisted_source() {
        let store = Arc::new(RuleStore::new());
        store.load_rules(["0.0.0.0/1", "0.0.0.0", "::/1"]).unwrap();
        let ring = Arc::new(AuditRing::new(8));
        let mut lane = lane(store, ring);

        let v4 = build::ipv4([2, 0, 0, 0, 0, 7], Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8), IPPROTO_TCP, 1, 2);
        let v6 = build::ipv6(
            [2, 0, 0, 0, 0, 7],
            "2001:db8::1".parse().unwrap(),
            Ipv6Addr::LOCALHOST,
            IPPROTO_TCP,
            1,
            2,
        );

        for cut in [&v4[..30], &v6[..30], &v4[..14], &v6[..14]] {
            let out = lane.classify(cut);
            assert_eq!(out.verdict, Verdict::Admit, "{} bytes", cut.len());
            assert_eq!(out.match_kind, MatchKind::Pass, "{} bytes", cut.len());
        }

        // whole frames still reach the IP tables
        assert_eq!(lane.classify(&v4).match_kind, MatchKind::Ipv4Cidr);
        assert_eq!(lane.classify(&v6).match_kind, MatchKind::Ipv6Cidr);
    }

    #[test]
    fn test_verdict_survives_full_sink() {
        let store = Arc::new(RuleStore::new());
        store.add_rule("1.2.3.4").unwrap();
        let ring = Arc::new(AuditRing::new(1));
        let mut lane = lane(store, ring.clone());

        let frame = build::ipv4([2; 6], Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(9, 9, 9, 9), IPPROTO_TCP, 1, 2);
        let first = lane.classify(&frame);
        let second = lane.classify(&frame);

        assert!(first.audited);
        assert!(!second.audited);
        assert_eq!(first.verdict, Verdict::Discard);
        assert_eq!(second.verdict, Verdict::Discard);
        assert_eq!(second.match_kind, MatchKind::Ipv4Exact);
        assert_eq!(ring.len(), 1);
    }
}
