//! OpenSASE Frame Firewall - rule store
//!
//! Five bounded tables consulted by the data plane for every frame:
//!
//! ```text
//!   control plane                         data plane lanes
//!  ┌──────────────┐   add / remove   ┌──────────────────────┐
//!  │  Blocklist   │ ───────────────► │      RuleStore       │
//!  │ (id, expiry) │                  │  writer: Mutex<()>   │
//!  └──────────────┘                  │  tables: ArcSwap ────┼──► load() (lock-free)
//!                                    └──────────────────────┘
//!                                              │
//!               ┌─────────┬───────────┬────────┴──┬───────────┬───────────┐
//!               │   MAC   │ IPv4 exact│ IPv4 CIDR │ IPv6 exact│ IPv6 CIDR │
//!               │ HashSet │  HashSet  │  LPM trie │  HashSet  │  LPM trie │
//!               └─────────┴───────────┴───────────┴───────────┴───────────┘
//! ```
//!
//! Every table has a fixed capacity; a full table rejects new keys and never
//! evicts. Writers copy the one table they change and publish the whole set
//! with a single pointer swap, so a reader sees either the old or the new
//! state of any one mutation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blocklist;
pub mod exact;
pub mod rule;
pub mod store;
pub mod trie;

pub use blocklist::{BlockRule, BlockSource, Blocklist, RulePage};
pub use exact::ExactSet;
pub use rule::RuleKey;
pub use store::{RuleStore, RuleTables};
pub use trie::{LpmTrie, PrefixKey};

use fw_common::{FwError, FwResult, Table, DEFAULT_TABLE_CAPACITY};
use serde::{Deserialize, Serialize};

/// Per-table entry limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableCapacities {
    /// MAC exact table
    pub mac: usize,
    /// IPv4 exact table
    pub ipv4_exact: usize,
    /// IPv4 CIDR trie
    pub ipv4_cidr: usize,
    /// IPv6 exact table
    pub ipv6_exact: usize,
    /// IPv6 CIDR trie
    pub ipv6_cidr: usize,
}

impl TableCapacities {
    /// Same limit for every table
    pub const fn uniform(capacity: usize) -> Self {
        Self {
            mac: capacity,
            ipv4_exact: capacity,
            ipv4_cidr: capacity,
            ipv6_exact: capacity,
            ipv6_cidr: capacity,
        }
    }

    /// Limit for one table
    pub const fn get(&self, table: Table) -> usize {
        match table {
            Table::Mac => self.mac,
            Table::Ipv4Exact => self.ipv4_exact,
            Table::Ipv4Cidr => self.ipv4_cidr,
            Table::Ipv6Exact => self.ipv6_exact,
            Table::Ipv6Cidr => self.ipv6_cidr,
        }
    }

    /// Reject zero-sized tables
    pub fn validate(&self) -> FwResult<()> {
        for table in Table::ALL {
            if self.get(table) == 0 {
                return Err(FwError::ConfigError(format!(
                    "{table} capacity must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

impl Default for TableCapacities {
    fn default() -> Self {
        Self::uniform(DEFAULT_TABLE_CAPACITY)
    }
}
