//! Verdicts and audit dispatch
//!
//! Every classified frame yields one [`AuditRecord`], `Pass` included. The
//! record is offered to an [`AuditSink`] without blocking; a sink that is
//! full or gone drops the record and bumps a counter. The verdict never
//! depends on whether the record was accepted.

use bytes::BufMut;
use crossbeam::channel::Sender;
use crossbeam::queue::ArrayQueue;
use fw_common::{AtomicCounter, AuditRecord, MatchKind, AUDIT_RECORD_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Counter of audit records the sink refused
pub const AUDIT_DROPPED_METRIC: &str = "fw_audit_dropped_total";

/// Final per-frame decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Hand the frame on
    Admit,
    /// Drop the frame
    Discard,
}

impl Verdict {
    /// Stable name used in logs and metric labels
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::Discard => "discard",
        }
    }
}

impl From<MatchKind> for Verdict {
    #[inline(always)]
    fn from(kind: MatchKind) -> Self {
        if kind.is_match() {
            Self::Discard
        } else {
            Self::Admit
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-blocking consumer of audit records
pub trait AuditSink: Send + Sync {
    /// Offer one record; hand it back if it cannot be taken now
    fn try_submit(&self, record: AuditRecord) -> Result<(), AuditRecord>;
}

impl AuditSink for Sender<AuditRecord> {
    fn try_submit(&self, record: AuditRecord) -> Result<(), AuditRecord> {
        self.try_send(record).map_err(|e| e.into_inner())
    }
}

/// Bounded lock-free audit queue, drop-on-full
#[derive(Debug)]
pub struct AuditRing {
    queue: ArrayQueue<AuditRecord>,
}

impl AuditRing {
    /// Ring holding at most `capacity` records (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Oldest record
    pub fn pop(&self) -> Option<AuditRecord> {
        self.queue.pop()
    }

    /// Move up to `max` records into `out`, returning how many moved
    pub fn drain_into(&self, out: &mut Vec<AuditRecord>, max: usize) -> usize {
        let mut moved = 0;
        while moved < max {
            match self.queue.pop() {
                Some(record) => {
                    out.push(record);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    /// Write up to `max` records in wire form, stopping early if `buf` fills
    pub fn encode_into<B: BufMut>(&self, buf: &mut B, max: usize) -> usize {
        let mut written = 0;
        while written < max && buf.remaining_mut() >= AUDIT_RECORD_LEN {
            match self.queue.pop() {
                Some(record) => {
                    record.encode(buf);
                    written += 1;
                }
                None => break,
            }
        }
        written
    }

    /// Records waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum records held
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl AuditSink for AuditRing {
    #[inline]
    fn try_submit(&self, record: AuditRecord) -> Result<(), AuditRecord> {
        self.queue.push(record)
    }
}

/// Shared handle lanes use to dispatch records
#[derive(Clone)]
pub struct AuditEmitter {
    sink: Arc<dyn AuditSink>,
    dropped: Arc<AtomicCounter>,
    dropped_total: metrics::Counter,
}

impl AuditEmitter {
    /// Dispatch to `sink`
    ///
    /// The drop counter binds to the metrics recorder installed at this point.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            dropped: Arc::new(AtomicCounter::new(0)),
            dropped_total: metrics::counter!(AUDIT_DROPPED_METRIC),
        }
    }

    /// Offer a record; returns false if it was dropped
    #[inline]
    pub fn emit(&self, record: AuditRecord) -> bool {
        match self.sink.try_submit(record) {
            Ok(()) => true,
            Err(_) => {
                let dropped = self.dropped.inc() + 1;
                self.dropped_total.increment(1);
                if dropped.is_power_of_two() {
                    warn!(dropped, "audit sink unavailable, records dropped");
                }
                false
            }
        }
    }

    /// Records dropped so far
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }
}

impl fmt::Debug for AuditEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditEmitter")
            .field("dropped", &self.dropped.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;
    use fw_common::PacketDescriptor;

    fn record(length: u32, kind: MatchKind) -> AuditRecord {
        AuditRecord::new(PacketDescriptor {
            length,
            match_kind: kind,
            ..Default::default()
        })
    }

    #[test]
    fn test_verdict_from_kind() {
        assert_eq!(Verdict::from(MatchKind::Pass), Verdict::Admit);
        for kind in &MatchKind::ALL[1..] {
            assert_eq!(Verdict::from(*kind), Verdict::Discard);
        }
        assert_eq!(Verdict::Discard.to_string(), "discard");
    }

    #[test]
    fn test_ring_drops_on_full() {
        let ring = Arc::new(AuditRing::new(2));
        let emitter = AuditEmitter::new(ring.clone());

        assert!(emitter.emit(record(1, MatchKind::Pass)));
        assert!(emitter.emit(record(2, MatchKind::Mac)));
        assert!(!emitter.emit(record(3, MatchKind::Pass)));
        assert!(!emitter.emit(record(4, MatchKind::Pass)));
        assert_eq!(emitter.dropped(), 2);
        assert_eq!(ring.len(), 2);

        // oldest records survive
        assert_eq!(ring.pop().unwrap().descriptor().length, 1);
        assert_eq!(ring.pop().unwrap().descriptor().length, 2);
        assert!(ring.pop().is_none());
    }

    #[test]
    fn test_ring_drain() {
        let ring = AuditRing::new(8);
        for i in 0..5 {
            ring.try_submit(record(i, MatchKind::Pass)).unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(ring.drain_into(&mut out, 3), 3);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.drain_into(&mut out, 10), 2);
        assert!(ring.is_empty());
        let lengths: Vec<_> = out.iter().map(|r| r.descriptor().length).collect();
        assert_eq!(lengths, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_ring_encode_into() {
        let ring = AuditRing::new(4);
        ring.try_submit(record(60, MatchKind::Ipv4Cidr)).unwrap();
        ring.try_submit(record(61, MatchKind::Pass)).unwrap();

        let mut buf = bytes::BytesMut::new();
        assert_eq!(ring.encode_into(&mut buf, 16), 2);
        assert_eq!(buf.len(), 2 * AUDIT_RECORD_LEN);

        let mut buf = buf.freeze();
        assert_eq!(AuditRecord::decode(&mut buf).unwrap().match_kind(), MatchKind::Ipv4Cidr);

        // a fixed buffer with room for one record takes one
        ring.try_submit(record(62, MatchKind::Pass)).unwrap();
        ring.try_submit(record(63, MatchKind::Pass)).unwrap();
        let mut fixed = [0u8; AUDIT_RECORD_LEN + 10];
        assert_eq!(ring.encode_into(&mut &mut fixed[..], 16), 1);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_channel_sink_closed() {
        let (tx, rx) = bounded::<AuditRecord>(1);
        let emitter = AuditEmitter::new(Arc::new(tx));

        assert!(emitter.emit(record(1, MatchKind::Pass)));
        assert!(!emitter.emit(record(2, MatchKind::Pass)));
        assert_eq!(rx.recv().unwrap().descriptor().length, 1);

        drop(rx);
        assert!(!emitter.emit(record(3, MatchKind::Pass)));
        assert_eq!(emitter.dropped(), 2);
    }
}
