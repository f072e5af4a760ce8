//! Error types for the frame firewall

use crate::Table;
use thiserror::Error;

/// Frame firewall error type
///
/// Only control-plane operations surface these. The per-packet path never
/// fails: malformed input degrades to zeroed descriptor fields.
#[derive(Error, Debug)]
pub enum FwError {
    /// Rule table already holds its maximum number of entries
    #[error("{table} table is full (capacity {capacity})")]
    CapacityExceeded {
        /// Table that rejected the insert
        table: Table,
        /// Configured capacity of that table
        capacity: usize,
    },

    /// CIDR prefix length out of range for the address family
    #[error("invalid prefix length /{len} (expected 1..={max})")]
    InvalidPrefix {
        /// Prefix length supplied
        len: u8,
        /// Longest prefix allowed for the family
        max: u8,
    },

    /// Rule text is not an address, CIDR block or MAC address
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// Block rule id not known
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    /// Audit record buffer too short
    #[error("truncated audit record: need {needed} bytes, got {got}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes available
        got: usize,
    },

    /// Audit record carries a match kind outside the known range
    #[error("unknown match kind: {0}")]
    UnknownMatchKind(u32),

    /// Configuration error
    #[error("config error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for the frame firewall
pub type FwResult<T> = Result<T, FwError>;
