//! Bounded exact-match sets

use fw_common::{FwError, FwResult, Table};
use std::collections::HashSet;
use std::hash::Hash;

/// Hash set with a hard entry limit
#[derive(Debug, Clone)]
pub struct ExactSet<K> {
    table: Table,
    entries: HashSet<K>,
    capacity: usize,
}

impl<K: Copy + Eq + Hash> ExactSet<K> {
    /// Create an empty set for `table` holding at most `capacity` keys
    pub fn new(table: Table, capacity: usize) -> Self {
        Self {
            table,
            entries: HashSet::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// `Ok(true)` if `key` would be new, `Ok(false)` if already present
    pub fn check_insert(&self, key: &K) -> FwResult<bool> {
        if self.entries.contains(key) {
            return Ok(false);
        }
        if self.entries.len() >= self.capacity {
            return Err(FwError::CapacityExceeded {
                table: self.table,
                capacity: self.capacity,
            });
        }
        Ok(true)
    }

    /// Insert a key, rejecting new keys once full
    pub fn insert(&mut self, key: K) -> FwResult<bool> {
        if !self.check_insert(&key)? {
            return Ok(false);
        }
        self.entries.insert(key);
        Ok(true)
    }

    /// Remove a key; absent keys are a no-op
    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key)
    }

    /// Membership test
    #[inline(always)]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of keys
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate stored keys in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_common::MacAddr;
    use std::net::Ipv4Addr;

    #[test]
    fn test_insert_remove() {
        let mut set = ExactSet::new(Table::Ipv4Exact, 4);
        let addr = Ipv4Addr::new(192, 168, 1, 5);

        assert!(set.insert(addr).unwrap());
        assert!(!set.insert(addr).unwrap());
        assert_eq!(set.len(), 1);
        assert!(set.contains(&addr));

        assert!(set.remove(&addr));
        assert!(!set.remove(&addr));
        assert!(set.is_empty());
    }

    #[test]
    fn test_capacity() {
        let mut set = ExactSet::new(Table::Mac, 2);
        set.insert(MacAddr::new([0, 0, 0, 0, 0, 1])).unwrap();
        set.insert(MacAddr::new([0, 0, 0, 0, 0, 2])).unwrap();

        let rejected = MacAddr::new([0, 0, 0, 0, 0, 3]);
        match set.insert(rejected) {
            Err(FwError::CapacityExceeded { table, capacity }) => {
                assert_eq!(table, Table::Mac);
                assert_eq!(capacity, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&rejected));

        // re-adding a present key at capacity is fine
        assert!(!set.insert(MacAddr::new([0, 0, 0, 0, 0, 1])).unwrap());
    }
}
