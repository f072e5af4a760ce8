//! Copy-on-write rule store with lock-free readers

use crate::exact::ExactSet;
use crate::rule::RuleKey;
use crate::trie::LpmTrie;
use crate::TableCapacities;
use arc_swap::{ArcSwap, Guard};
use fw_common::{FwResult, MacAddr, Table};
use parking_lot::Mutex;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// One immutable generation of the five rule tables
///
/// Tables sit behind their own `Arc`, so publishing a change to one table
/// shares the other four with the previous generation.
#[derive(Debug, Clone)]
pub struct RuleTables {
    mac: Arc<ExactSet<MacAddr>>,
    ipv4_exact: Arc<ExactSet<Ipv4Addr>>,
    ipv4_cidr: Arc<LpmTrie<Ipv4Addr>>,
    ipv6_exact: Arc<ExactSet<Ipv6Addr>>,
    ipv6_cidr: Arc<LpmTrie<Ipv6Addr>>,
}

impl RuleTables {
    /// Empty tables with the given limits
    pub fn new(capacities: TableCapacities) -> Self {
        Self {
            mac: Arc::new(ExactSet::new(Table::Mac, capacities.mac)),
            ipv4_exact: Arc::new(ExactSet::new(Table::Ipv4Exact, capacities.ipv4_exact)),
            ipv4_cidr: Arc::new(LpmTrie::new(Table::Ipv4Cidr, capacities.ipv4_cidr)),
            ipv6_exact: Arc::new(ExactSet::new(Table::Ipv6Exact, capacities.ipv6_exact)),
            ipv6_cidr: Arc::new(LpmTrie::new(Table::Ipv6Cidr, capacities.ipv6_cidr)),
        }
    }

    /// Source MAC is listed
    #[inline(always)]
    pub fn contains_mac(&self, mac: &MacAddr) -> bool {
        self.mac.contains(mac)
    }

    /// Source IPv4 is listed exactly
    #[inline(always)]
    pub fn contains_ipv4(&self, addr: &Ipv4Addr) -> bool {
        self.ipv4_exact.contains(addr)
    }

    /// Some IPv4 block covers `addr`
    #[inline(always)]
    pub fn lookup_ipv4_cidr(&self, addr: Ipv4Addr) -> bool {
        self.ipv4_cidr.lookup(addr)
    }

    /// Source IPv6 is listed exactly
    #[inline(always)]
    pub fn contains_ipv6(&self, addr: &Ipv6Addr) -> bool {
        self.ipv6_exact.contains(addr)
    }

    /// Some IPv6 block covers `addr`
    #[inline(always)]
    pub fn lookup_ipv6_cidr(&self, addr: Ipv6Addr) -> bool {
        self.ipv6_cidr.lookup(addr)
    }

    /// Membership of one key in its own table
    ///
    /// CIDR keys test for that exact block, not for coverage.
    pub fn contains(&self, key: &RuleKey) -> bool {
        match key {
            RuleKey::Mac(mac) => self.mac.contains(mac),
            RuleKey::Ipv4(addr) => self.ipv4_exact.contains(addr),
            RuleKey::Ipv4Cidr { addr, prefix_len } => self.ipv4_cidr.contains(*addr, *prefix_len),
            RuleKey::Ipv6(addr) => self.ipv6_exact.contains(addr),
            RuleKey::Ipv6Cidr { addr, prefix_len } => self.ipv6_cidr.contains(*addr, *prefix_len),
        }
    }

    /// Entries in one table
    pub fn len(&self, table: Table) -> usize {
        match table {
            Table::Mac => self.mac.len(),
            Table::Ipv4Exact => self.ipv4_exact.len(),
            Table::Ipv4Cidr => self.ipv4_cidr.len(),
            Table::Ipv6Exact => self.ipv6_exact.len(),
            Table::Ipv6Cidr => self.ipv6_cidr.len(),
        }
    }

    /// Entries across all tables
    pub fn total(&self) -> usize {
        Table::ALL.iter().map(|t| self.len(*t)).sum()
    }

    /// Every stored key, table by table
    pub fn keys(&self) -> Vec<RuleKey> {
        let mut keys = Vec::with_capacity(self.total());
        keys.extend(self.mac.iter().copied().map(RuleKey::Mac));
        keys.extend(self.ipv4_exact.iter().copied().map(RuleKey::Ipv4));
        keys.extend(
            self.ipv4_cidr
                .prefixes()
                .into_iter()
                .map(|(addr, prefix_len)| RuleKey::Ipv4Cidr { addr, prefix_len }),
        );
        keys.extend(self.ipv6_exact.iter().copied().map(RuleKey::Ipv6));
        keys.extend(
            self.ipv6_cidr
                .prefixes()
                .into_iter()
                .map(|(addr, prefix_len)| RuleKey::Ipv6Cidr { addr, prefix_len }),
        );
        keys
    }
}

/// Rule store shared by every lane and the control plane
#[derive(Debug)]
pub struct RuleStore {
    /// Current generation (atomically swappable)
    tables: ArcSwap<RuleTables>,
    capacities: TableCapacities,
    /// Bumped once per successful mutation
    version: AtomicU64,
    /// Serializes writers; readers never take it
    writer: Mutex<()>,
}

impl RuleStore {
    /// Empty store with default capacities
    pub fn new() -> Self {
        Self::with_capacities(TableCapacities::default())
    }

    /// Empty store with explicit capacities
    pub fn with_capacities(capacities: TableCapacities) -> Self {
        Self {
            tables: ArcSwap::from_pointee(RuleTables::new(capacities)),
            capacities,
            version: AtomicU64::new(0),
            writer: Mutex::new(()),
        }
    }

    /// Current tables for the packet path
    #[inline(always)]
    pub fn snapshot(&self) -> Guard<Arc<RuleTables>> {
        self.tables.load()
    }

    /// Current tables as an owned handle
    pub fn load_full(&self) -> Arc<RuleTables> {
        self.tables.load_full()
    }

    /// Get current version
    #[inline(always)]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Configured limits
    pub fn capacities(&self) -> TableCapacities {
        self.capacities
    }

    /// Limit of one table
    pub fn capacity(&self, table: Table) -> usize {
        self.capacities.get(table)
    }

    /// Entries in one table
    pub fn size(&self, table: Table) -> usize {
        self.tables.load().len(table)
    }

    /// Membership of `key` in its table
    pub fn contains(&self, key: &RuleKey) -> bool {
        self.tables.load().contains(key)
    }

    /// Insert a key
    ///
    /// Returns `Ok(false)` if the key was already present. A full table
    /// rejects new keys with `CapacityExceeded` and is left untouched.
    pub fn add(&self, key: RuleKey) -> FwResult<bool> {
        let _writer = self.writer.lock();
        let current = self.tables.load_full();

        let mut next = RuleTables::clone(&current);
        let result = match key {
            RuleKey::Mac(mac) => match current.mac.check_insert(&mac) {
                Ok(true) => Arc::make_mut(&mut next.mac).insert(mac),
                other => other,
            },
            RuleKey::Ipv4(addr) => match current.ipv4_exact.check_insert(&addr) {
                Ok(true) => Arc::make_mut(&mut next.ipv4_exact).insert(addr),
                other => other,
            },
            RuleKey::Ipv4Cidr { addr, prefix_len } => {
                match current.ipv4_cidr.check_insert(addr, prefix_len) {
                    Ok(true) => Arc::make_mut(&mut next.ipv4_cidr).insert(addr, prefix_len),
                    other => other,
                }
            }
            RuleKey::Ipv6(addr) => match current.ipv6_exact.check_insert(&addr) {
                Ok(true) => Arc::make_mut(&mut next.ipv6_exact).insert(addr),
                other => other,
            },
            RuleKey::Ipv6Cidr { addr, prefix_len } => {
                match current.ipv6_cidr.check_insert(addr, prefix_len) {
                    Ok(true) => Arc::make_mut(&mut next.ipv6_cidr).insert(addr, prefix_len),
                    other => other,
                }
            }
        };

        match result {
            Ok(true) => {
                self.publish(next);
                info!(rule = %key, table = %key.table(), "rule added");
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                warn!(rule = %key, error = %e, "rule rejected");
                Err(e)
            }
        }
    }

    /// Remove a key; absent keys are a no-op returning `false`
    pub fn remove(&self, key: &RuleKey) -> bool {
        let _writer = self.writer.lock();
        let current = self.tables.load_full();
        if !current.contains(key) {
            return false;
        }

        let mut next = RuleTables::clone(&current);
        let removed = match key {
            RuleKey::Mac(mac) => Arc::make_mut(&mut next.mac).remove(mac),
            RuleKey::Ipv4(addr) => Arc::make_mut(&mut next.ipv4_exact).remove(addr),
            RuleKey::Ipv4Cidr { addr, prefix_len } => {
                Arc::make_mut(&mut next.ipv4_cidr).remove(*addr, *prefix_len)
            }
            RuleKey::Ipv6(addr) => Arc::make_mut(&mut next.ipv6_exact).remove(addr),
            RuleKey::Ipv6Cidr { addr, prefix_len } => {
                Arc::make_mut(&mut next.ipv6_cidr).remove(*addr, *prefix_len)
            }
        };

        if removed {
            self.publish(next);
            info!(rule = %key, table = %key.table(), "rule removed");
        }
        removed
    }

    /// Parse and insert a rule in text form
    pub fn add_rule(&self, text: &str) -> FwResult<bool> {
        self.add(text.parse()?)
    }

    /// Parse and remove a rule in text form
    pub fn remove_rule(&self, text: &str) -> FwResult<bool> {
        let key: RuleKey = text.parse()?;
        Ok(self.remove(&key))
    }

    /// Insert rules one at a time, stopping at the first failure
    ///
    /// Rules applied before the failure stay applied. Returns the number of
    /// keys that were new.
    pub fn load_rules<I, S>(&self, rules: I) -> FwResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for rule in rules {
            if self.add_rule(rule.as_ref())? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Drop every rule
    pub fn clear(&self) {
        let _writer = self.writer.lock();
        self.publish(RuleTables::new(self.capacities));
        info!("rule store cleared");
    }

    fn publish(&self, next: RuleTables) {
        self.tables.store(Arc::new(next));
        self.version.fetch_add(1, Ordering::Release);
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}
