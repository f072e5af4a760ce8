//! Bounded binary prefix trie for longest-prefix match
//!
//! # Design
//!
//! - Arena of nodes addressed by `u32` index, node 0 is the root (/0)
//! - One level per address bit, so lookups take at most `BITS` steps
//! - Capacity counts prefixes, not nodes
//! - Freed nodes go to a free list and are reused by later inserts
//!
//! The trie itself is a plain single-owner structure. Concurrent readers get
//! it through the copy-on-write table set in [`crate::store`].

use fw_common::{FwError, FwResult, Table};
use std::fmt;
use std::marker::PhantomData;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Address type usable as a trie key
pub trait PrefixKey: Copy + Eq + fmt::Debug {
    /// Address width in bits
    const BITS: u8;

    /// All-zero address
    const ZERO: Self;

    /// Bit `idx`, counted from the most significant bit
    fn bit(&self, idx: u8) -> bool;

    /// Copy with bit `idx` set
    fn with_bit(self, idx: u8) -> Self;

    /// Copy with every bit past `prefix_len` cleared
    fn masked(self, prefix_len: u8) -> Self;
}

impl PrefixKey for Ipv4Addr {
    const BITS: u8 = 32;
    const ZERO: Self = Ipv4Addr::UNSPECIFIED;

    #[inline(always)]
    fn bit(&self, idx: u8) -> bool {
        (u32::from(*self) >> (31 - u32::from(idx))) & 1 == 1
    }

    fn with_bit(self, idx: u8) -> Self {
        Self::from(u32::from(self) | (1 << (31 - u32::from(idx))))
    }

    fn masked(self, prefix_len: u8) -> Self {
        let mask = u32::MAX
            .checked_shl(u32::from(<Self as PrefixKey>::BITS.saturating_sub(prefix_len)))
            .unwrap_or(0);
        Self::from(u32::from(self) & mask)
    }
}

impl PrefixKey for Ipv6Addr {
    const BITS: u8 = 128;
    const ZERO: Self = Ipv6Addr::UNSPECIFIED;

    #[inline(always)]
    fn bit(&self, idx: u8) -> bool {
        (u128::from(*self) >> (127 - u32::from(idx))) & 1 == 1
    }

    fn with_bit(self, idx: u8) -> Self {
        Self::from(u128::from(self) | (1 << (127 - u32::from(idx))))
    }

    fn masked(self, prefix_len: u8) -> Self {
        let mask = u128::MAX
            .checked_shl(u32::from(<Self as PrefixKey>::BITS.saturating_sub(prefix_len)))
            .unwrap_or(0);
        Self::from(u128::from(self) & mask)
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    children: [Option<u32>; 2],
    terminal: bool,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.children == [None, None]
    }
}

/// Longest-prefix-match trie with a hard entry limit
#[derive(Debug, Clone)]
pub struct LpmTrie<K> {
    table: Table,
    nodes: Vec<Node>,
    free: Vec<u32>,
    entries: usize,
    capacity: usize,
    _key: PhantomData<K>,
}

impl<K: PrefixKey> LpmTrie<K> {
    /// Create an empty trie for `table` holding at most `capacity` prefixes
    pub fn new(table: Table, capacity: usize) -> Self {
        Self {
            table,
            nodes: vec![Node::default()],
            free: Vec::new(),
            entries: 0,
            capacity,
            _key: PhantomData,
        }
    }

    /// Reject prefix lengths outside `1..=BITS`
    pub fn validate_prefix(prefix_len: u8) -> FwResult<()> {
        if prefix_len == 0 || prefix_len > K::BITS {
            return Err(FwError::InvalidPrefix {
                len: prefix_len,
                max: K::BITS,
            });
        }
        Ok(())
    }

    /// Check whether inserting would add a new prefix
    ///
    /// `Ok(false)` when the prefix is already present, an error when the
    /// prefix is invalid or the trie is full.
    pub fn check_insert(&self, addr: K, prefix_len: u8) -> FwResult<bool> {
        Self::validate_prefix(prefix_len)?;
        if self.contains(addr, prefix_len) {
            return Ok(false);
        }
        if self.entries >= self.capacity {
            return Err(FwError::CapacityExceeded {
                table: self.table,
                capacity: self.capacity,
            });
        }
        Ok(true)
    }

    /// Insert `addr/prefix_len`, host bits are ignored
    ///
    /// Returns `Ok(true)` if the prefix is new.
    pub fn insert(&mut self, addr: K, prefix_len: u8) -> FwResult<bool> {
        if !self.check_insert(addr, prefix_len)? {
            return Ok(false);
        }

        let mut cur = 0usize;
        for depth in 0..prefix_len {
            let bit = usize::from(addr.bit(depth));
            cur = match self.nodes[cur].children[bit] {
                Some(next) => next as usize,
                None => {
                    let next = self.alloc_node();
                    self.nodes[cur].children[bit] = Some(next);
                    next as usize
                }
            };
        }

        self.nodes[cur].terminal = true;
        self.entries += 1;
        Ok(true)
    }

    /// Remove `addr/prefix_len`; absent prefixes are a no-op
    pub fn remove(&mut self, addr: K, prefix_len: u8) -> bool {
        if Self::validate_prefix(prefix_len).is_err() {
            return false;
        }

        let mut path = Vec::with_capacity(usize::from(prefix_len) + 1);
        let mut cur = 0usize;
        path.push(cur);
        for depth in 0..prefix_len {
            match self.nodes[cur].children[usize::from(addr.bit(depth))] {
                Some(next) => {
                    cur = next as usize;
                    path.push(cur);
                }
                None => return false,
            }
        }

        if !self.nodes[cur].terminal {
            return false;
        }
        self.nodes[cur].terminal = false;
        self.entries -= 1;

        // Prune now-empty nodes bottom-up; the root always stays.
        for depth in (1..path.len()).rev() {
            let node = path[depth];
            if self.nodes[node].terminal || !self.nodes[node].is_leaf() {
                break;
            }
            let parent = path[depth - 1];
            let bit = usize::from(addr.bit((depth - 1) as u8));
            self.nodes[parent].children[bit] = None;
            self.nodes[node] = Node::default();
            self.free.push(node as u32);
        }

        true
    }

    /// Exact prefix membership (not a longest-prefix lookup)
    pub fn contains(&self, addr: K, prefix_len: u8) -> bool {
        if prefix_len == 0 || prefix_len > K::BITS {
            return false;
        }
        let mut cur = 0usize;
        for depth in 0..prefix_len {
            match self.nodes[cur].children[usize::from(addr.bit(depth))] {
                Some(next) => cur = next as usize,
                None => return false,
            }
        }
        self.nodes[cur].terminal
    }

    /// Length of the longest stored prefix covering `addr`
    ///
    /// Walks at most `BITS` levels regardless of table contents.
    #[inline]
    pub fn longest_match(&self, addr: K) -> Option<u8> {
        let mut best = None;
        let mut cur = 0usize;
        for depth in 0..K::BITS {
            match self.nodes[cur].children[usize::from(addr.bit(depth))] {
                Some(next) => {
                    cur = next as usize;
                    if self.nodes[cur].terminal {
                        best = Some(depth + 1);
                    }
                }
                None => break,
            }
        }
        best
    }

    /// True if any stored prefix covers `addr`
    #[inline(always)]
    pub fn lookup(&self, addr: K) -> bool {
        self.longest_match(addr).is_some()
    }

    /// Stored prefixes as `(network, prefix_len)`, in bit order
    pub fn prefixes(&self) -> Vec<(K, u8)> {
        let mut out = Vec::with_capacity(self.entries);
        let mut stack = vec![(0usize, K::ZERO, 0u8)];
        while let Some((idx, addr, depth)) = stack.pop() {
            let node = &self.nodes[idx];
            if node.terminal {
                out.push((addr, depth));
            }
            // push the 1-branch first so the 0-branch is visited first
            if let Some(one) = node.children[1] {
                stack.push((one as usize, addr.with_bit(depth), depth + 1));
            }
            if let Some(zero) = node.children[0] {
                stack.push((zero as usize, addr, depth + 1));
            }
        }
        out
    }

    /// Number of stored prefixes
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Maximum number of prefixes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Nodes currently in use, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn alloc_node(&mut self) -> u32 {
        match self.free.pop() {
            Some(idx) => idx,
            None => {
                self.nodes.push(Node::default());
                (self.nodes.len() - 1) as u32
            }
        }
    }
}
