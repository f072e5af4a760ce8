//! Named block rules with expiry
//!
//! A [`BlockRule`] wraps one rule text with bookkeeping the packet path does
//! not need: who added it, why, and until when. The [`Blocklist`] keeps the
//! [`RuleStore`] in step with the enabled, unexpired rules it holds.
//!
//! Several block rules may name the same key. The key stays installed until
//! the last enabled rule naming it is disabled, deleted or swept.

use crate::rule::RuleKey;
use crate::store::RuleStore;
use chrono::{DateTime, Duration, Utc};
use fw_common::{FwError, FwResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Page size used when the caller asks for zero
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Who created a block rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSource {
    /// Operator
    User,
    /// Threat intelligence feed
    Intel,
    /// Traffic analyzer
    Analyzer,
}

/// Block rule record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    /// Assigned on creation
    pub id: Uuid,
    /// Rule text (address, CIDR block or MAC)
    pub value: String,
    /// Free-form note
    #[serde(default)]
    pub note: String,
    /// Origin
    pub source: BlockSource,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Installed in the rule store while true
    pub enabled: bool,
    /// Removed by the next sweep after this instant
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl BlockRule {
    /// Enabled rule with no expiry
    pub fn new(value: impl Into<String>, source: BlockSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            value: value.into(),
            note: String::new(),
            source,
            created_at: Utc::now(),
            enabled: true,
            expires_at: None,
        }
    }

    /// Attach a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Expire `ttl` after creation
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(self.created_at + ttl);
        self
    }

    /// Expire at a fixed instant
    pub fn with_expiry(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Record without installing
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Expiry has passed at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Parsed rule key
    pub fn key(&self) -> FwResult<RuleKey> {
        self.value.parse()
    }
}

/// One page of block rules
#[derive(Debug, Clone, Serialize)]
pub struct RulePage {
    /// Rules on this page, in insertion order
    pub rules: Vec<BlockRule>,
    /// Rules across all pages
    pub total: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    rule: BlockRule,
    key: RuleKey,
}

/// Block rules mirrored into a shared rule store
pub struct Blocklist {
    store: Arc<RuleStore>,
    entries: RwLock<Vec<Entry>>,
}

impl Blocklist {
    /// Manage rules in `store`
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Backing store
    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Record a rule, installing it when enabled
    ///
    /// A rule already past its expiry is recorded disabled. If the store
    /// rejects the key the rule is not recorded.
    pub fn add(&self, mut rule: BlockRule) -> FwResult<Uuid> {
        let key = rule.key()?;
        let mut entries = self.entries.write();

        if rule.enabled && rule.is_expired(Utc::now()) {
            rule.enabled = false;
        }
        if rule.enabled {
            self.store.add(key)?;
        }

        info!(
            id = %rule.id,
            rule = %key,
            source = ?rule.source,
            enabled = rule.enabled,
            "block rule added"
        );
        let id = rule.id;
        entries.push(Entry { rule, key });
        Ok(id)
    }

    /// Look up one rule
    pub fn get(&self, id: Uuid) -> Option<BlockRule> {
        self.entries
            .read()
            .iter()
            .find(|e| e.rule.id == id)
            .map(|e| e.rule.clone())
    }

    /// Enable or disable a rule
    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> FwResult<()> {
        let mut entries = self.entries.write();
        let idx = position(&entries, id)?;

        let entry = &entries[idx];
        if entry.rule.enabled == enabled {
            return Ok(());
        }

        let key = entry.key;
        if enabled {
            if entry.rule.is_expired(Utc::now()) {
                return Err(FwError::InvalidRule(format!("rule {id} has expired")));
            }
            self.store.add(key)?;
        } else if !shared(&entries, idx, &key) {
            self.store.remove(&key);
        }

        entries[idx].rule.enabled = enabled;
        info!(%id, rule = %key, enabled, "block rule updated");
        Ok(())
    }

    /// Forget a rule, uninstalling its key if nothing else needs it
    pub fn delete(&self, id: Uuid) -> FwResult<BlockRule> {
        let mut entries = self.entries.write();
        let idx = position(&entries, id)?;

        let key = entries[idx].key;
        if entries[idx].rule.enabled && !shared(&entries, idx, &key) {
            self.store.remove(&key);
        }

        let entry = entries.remove(idx);
        info!(%id, rule = %key, "block rule deleted");
        Ok(entry.rule)
    }

    /// Drop every rule expired at `now`, returning how many were dropped
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();

        let (expired, live): (Vec<Entry>, Vec<Entry>) =
            entries.drain(..).partition(|e| e.rule.is_expired(now));

        for entry in expired.iter().filter(|e| e.rule.enabled) {
            let still_needed = live.iter().any(|e| e.rule.enabled && e.key == entry.key);
            if !still_needed {
                self.store.remove(&entry.key);
            }
        }
        *entries = live;

        let removed = before - entries.len();
        if removed > 0 {
            warn!(removed, "expired block rules swept");
        }
        removed
    }

    /// One page of rules
    ///
    /// Pages are 1-based; `page` 0 is read as 1 and `page_size` 0 as
    /// [`DEFAULT_PAGE_SIZE`].
    pub fn list(&self, page: usize, page_size: usize) -> RulePage {
        let page = page.max(1);
        let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };

        let entries = self.entries.read();
        let total = entries.len();
        let rules = entries
            .iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .map(|e| e.rule.clone())
            .collect();

        RulePage { rules, total }
    }

    /// Number of recorded rules
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn position(entries: &[Entry], id: Uuid) -> FwResult<usize> {
    entries
        .iter()
        .position(|e| e.rule.id == id)
        .ok_or_else(|| FwError::RuleNotFound(id.to_string()))
}

/// Another enabled rule names the same key
fn shared(entries: &[Entry], skip: usize, key: &RuleKey) -> bool {
    entries
        .iter()
        .enumerate()
        .any(|(i, e)| i != skip && e.rule.enabled && e.key == *key)
}
