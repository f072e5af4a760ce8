//! Classifier configuration
//!
//! ```json
//! {
//!   "tables": { "mac": 1024, "ipv4_exact": 1024, "ipv4_cidr": 1024,
//!               "ipv6_exact": 1024, "ipv6_cidr": 1024 },
//!   "lanes": 4,
//!   "audit_queue_capacity": 65536,
//!   "rules": ["10.0.0.0/8", "aa:bb:cc:dd:ee:ff"],
//!   "intel": { "match_mode": "threshold", "match_threshold": 3,
//!              "match_window_secs": 86400, "block_duration_secs": 604800 }
//! }
//! ```
//!
//! Every field is optional.

use crate::intel::IntelConfig;
use fw_common::FwError;
use fw_rules::{RuleKey, TableCapacities};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default audit ring size
pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1 << 16;

/// Classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Per-table entry limits
    pub tables: TableCapacities,
    /// Number of processing lanes
    pub lanes: usize,
    /// Audit ring size in records
    pub audit_queue_capacity: usize,
    /// Rules installed at startup
    pub rules: Vec<RuleKey>,
    /// Threat-intel matcher settings
    pub intel: IntelConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            tables: TableCapacities::default(),
            lanes: num_lanes(),
            audit_queue_capacity: DEFAULT_AUDIT_QUEUE_CAPACITY,
            rules: Vec::new(),
            intel: IntelConfig::default(),
        }
    }
}

/// One lane per available CPU
fn num_lanes() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ClassifierConfig {
    /// Load and validate from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;
        let config: ClassifierConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }
        fs::write(path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        Ok(())
    }

    /// Reject zero-sized tables, lanes or audit ring and bad intel settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tables
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.intel
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.lanes == 0 {
            return Err(ConfigError::Invalid("lanes must be greater than zero".into()));
        }
        if self.audit_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "audit_queue_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    ReadError(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("failed to serialize config: {0}")]
    SerializeError(String),

    #[error("failed to write config: {0}")]
    WriteError(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for FwError {
    fn from(err: ConfigError) -> Self {
        FwError::ConfigError(err.to_string())
    }
}
