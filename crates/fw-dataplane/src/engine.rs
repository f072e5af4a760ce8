//! Classifier engine
//!
//! Owns the shared rule store, the audit path and one [`Lane`] per
//! processing context.

use crate::audit::{AuditEmitter, AuditRing, AuditSink};
use crate::config::ClassifierConfig;
use crate::lane::{Classification, Lane};
use crate::stats::{AggregateStats, LaneStatsSnapshot};
use fw_common::FwResult;
use fw_rules::RuleStore;
use std::sync::Arc;
use std::thread;

/// Frame classifier
///
/// Single frames go through lane 0. Batches are split into contiguous runs,
/// one per lane, and processed on scoped threads; results keep input order.
#[derive(Debug)]
pub struct Classifier {
    config: ClassifierConfig,
    store: Arc<RuleStore>,
    ring: Option<Arc<AuditRing>>,
    audit: AuditEmitter,
    stats: Arc<AggregateStats>,
    lanes: Vec<Lane>,
}

impl Classifier {
    /// Classifier auditing into its own bounded ring
    pub fn new(config: ClassifierConfig) -> FwResult<Self> {
        config.validate()?;
        let ring = Arc::new(AuditRing::new(config.audit_queue_capacity));
        Self::build(config, ring.clone(), Some(ring))
    }

    /// Classifier auditing into a caller-supplied sink
    pub fn with_sink(config: ClassifierConfig, sink: Arc<dyn AuditSink>) -> FwResult<Self> {
        config.validate()?;
        Self::build(config, sink, None)
    }

    fn build(
        config: ClassifierConfig,
        sink: Arc<dyn AuditSink>,
        ring: Option<Arc<AuditRing>>,
    ) -> FwResult<Self> {
        let store = Arc::new(RuleStore::with_capacities(config.tables));
        for key in &config.rules {
            store.add(*key)?;
        }

        let audit = AuditEmitter::new(sink);
        let stats = Arc::new(AggregateStats::new(config.lanes));
        let lanes = (0..config.lanes)
            .map(|id| Lane::new(id, store.clone(), audit.clone(), stats.clone()))
            .collect();

        tracing::info!(
            lanes = config.lanes,
            rules = config.rules.len(),
            audit_queue = ?ring.as_ref().map(|r| r.capacity()),
            "classifier ready"
        );

        Ok(Self {
            config,
            store,
            ring,
            audit,
            stats,
            lanes,
        })
    }

    /// Classify one frame on lane 0
    #[inline]
    pub fn classify(&mut self, frame: &[u8]) -> Classification {
        self.lanes[0].classify(frame)
    }

    /// Classify a batch across all lanes, preserving order
    pub fn classify_batch<F>(&mut self, frames: &[F]) -> Vec<Classification>
    where
        F: AsRef<[u8]> + Sync,
    {
        let mut out = vec![Classification::default(); frames.len()];
        if frames.is_empty() {
            return out;
        }

        if self.lanes.len() == 1 || frames.len() == 1 {
            let lane = &mut self.lanes[0];
            for (frame, slot) in frames.iter().zip(out.iter_mut()) {
                *slot = lane.classify(frame.as_ref());
            }
            return out;
        }

        let run = frames.len().div_ceil(self.lanes.len());
        thread::scope(|s| {
            for ((lane, input), output) in self
                .lanes
                .iter_mut()
                .zip(frames.chunks(run))
                .zip(out.chunks_mut(run))
            {
                s.spawn(move || {
                    for (frame, slot) in input.iter().zip(output.iter_mut()) {
                        *slot = lane.classify(frame.as_ref());
                    }
                });
            }
        });
        out
    }

    /// Shared rule store, for the control plane
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Built-in audit ring, absent when a custom sink was supplied
    pub fn audit_ring(&self) -> Option<&Arc<AuditRing>> {
        self.ring.as_ref()
    }

    /// Audit records dropped across all lanes
    pub fn audit_dropped(&self) -> u64 {
        self.audit.dropped()
    }

    /// Stats summed over all lanes
    pub fn stats(&self) -> LaneStatsSnapshot {
        self.stats.total()
    }

    /// Stats of one lane
    pub fn lane_stats(&self, idx: usize) -> Option<LaneStatsSnapshot> {
        (idx < self.stats.num_lanes()).then(|| self.stats.lane(idx).snapshot())
    }

    /// Lanes, for callers that drive them from their own threads
    pub fn lanes_mut(&mut self) -> &mut [Lane] {
        &mut self.lanes
    }

    /// Active configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}
