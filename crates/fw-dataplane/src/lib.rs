//! OpenSASE Frame Firewall - data plane
//!
//! Source-address classifier run once per received frame.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           CLASSIFIER                             │
//! │                                                                  │
//! │  ┌──────────────┐  ┌──────────────┐        ┌──────────────┐      │
//! │  │    Lane 0    │  │    Lane 1    │  ...   │    Lane N    │      │
//! │  │              │  │              │        │              │      │
//! │  │ frame bytes  │  │ frame bytes  │        │ frame bytes  │      │
//! │  │      │       │  │      │       │        │      │       │      │
//! │  │      ▼       │  │      ▼       │        │      ▼       │      │
//! │  │ ┌──────────┐ │  │ ┌──────────┐ │        │ ┌──────────┐ │      │
//! │  │ │  Parser  │ │  │ │  Parser  │ │        │ │  Parser  │ │      │
//! │  │ │ scratch  │ │  │ │ scratch  │ │        │ │ scratch  │ │      │
//! │  │ └────┬─────┘ │  │ └────┬─────┘ │        │ └────┬─────┘ │      │
//! │  │      ▼       │  │      ▼       │        │      ▼       │      │
//! │  │ ┌──────────┐ │  │ ┌──────────┐ │        │ ┌──────────┐ │      │
//! │  │ │ Matcher  │◄┼──┼─┤ Matcher  │◄┼── RuleStore snapshot ─┤      │
//! │  │ └────┬─────┘ │  │ └────┬─────┘ │        │ └────┬─────┘ │      │
//! │  │      ▼       │  │      ▼       │        │      ▼       │      │
//! │  │  verdict +   │  │  verdict +   │        │  verdict +   │      │
//! │  │ audit record │  │ audit record │        │ audit record │      │
//! │  └──────┬───────┘  └──────┬───────┘        └──────┬───────┘      │
//! │         └────────────┬────┴───────────────────────┘              │
//! │                      ▼                                           │
//! │            AuditRing (drop-on-full) ──► AuditCollector           │
//! │                                     └─► ThreatIntel ─► Blocklist │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Match priority
//!
//! | Order | Table      | Applies to  | Result      |
//! |-------|------------|-------------|-------------|
//! | 1     | MAC exact  | all frames  | `Mac`       |
//! | 2     | IPv4 exact | IPv4 frames | `Ipv4Exact` |
//! | 3     | IPv4 CIDR  | IPv4 frames | `Ipv4Cidr`  |
//! | 4     | IPv6 exact | IPv6 frames | `Ipv6Exact` |
//! | 5     | IPv6 CIDR  | IPv6 frames | `Ipv6Cidr`  |
//! | -     | none       |             | `Pass`      |
//!
//! IP stages run only once the whole network header was decoded. Any match
//! discards the frame; `Pass` admits it. The packet path never fails, blocks
//! or allocates.

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod audit;
pub mod collector;
pub mod config;
pub mod engine;
pub mod intel;
pub mod lane;
pub mod matcher;
pub mod parser;
pub mod stats;

pub use audit::{AuditEmitter, AuditRing, AuditSink, Verdict};
pub use collector::{AuditCollector, CollectorReport, Dimension};
pub use config::{ClassifierConfig, ConfigError};
pub use engine::Classifier;
pub use intel::{IntelAction, IntelConfig, MatchMode, ThreatIntel};
pub use lane::{Classification, Lane};
pub use matcher::match_source;
pub use parser::{parse, parse_into, ParseDepth};
pub use stats::{AggregateStats, LaneStats, LaneStatsSnapshot};

/// Frames per batch in the replay tool and benches
pub const BATCH_SIZE: usize = 64;
