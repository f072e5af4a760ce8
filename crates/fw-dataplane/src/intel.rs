//! Threat-intelligence matcher
//!
//! Runs on the consumer side of the audit ring. Admitted frames whose source
//! address is listed as an indicator are turned into block rules:
//!
//! | Mode        | Action on an indicator hit                           |
//! |-------------|------------------------------------------------------|
//! | `monitor`   | record a disabled rule                               |
//! | `block`     | install a rule at once                               |
//! | `threshold` | install once the source hits `match_threshold` times |
//! |             | within `match_window_secs`                           |
//!
//! Installed rules carry a TTL of `block_duration_secs` (none if zero) and
//! are swept by [`Blocklist::sweep_expired`]. A source is reported at most
//! once per window. Fetching indicator feeds is left to the caller; this
//! module only holds what it is given.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fw_common::{AtomicCounter, AuditRecord, FwError, FwResult, Table};
use fw_rules::{BlockRule, BlockSource, Blocklist, LpmTrie, PrefixKey, RuleKey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default hits before a source is blocked
pub const DEFAULT_MATCH_THRESHOLD: u32 = 3;

/// Default counting window: one day
pub const DEFAULT_MATCH_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Default block duration: seven days
pub const DEFAULT_BLOCK_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Default bound on indicators per address family
pub const DEFAULT_MAX_INDICATORS: usize = 65_536;

/// Longest window or block duration accepted: one hundred years
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Note attached to rules created here
pub const INTEL_RULE_NOTE: &str = "matched threat intelligence";

/// Reserved and private ranges skipped when `ignore_local_network` is set
const LOCAL_V4: [(Ipv4Addr, u8); 17] = [
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(100, 64, 0, 0), 10),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 0, 0, 0), 24),
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(192, 88, 99, 0), 24),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    (Ipv4Addr::new(224, 0, 0, 0), 4),
    (Ipv4Addr::new(233, 252, 0, 0), 24),
    (Ipv4Addr::new(240, 0, 0, 0), 4),
    (Ipv4Addr::new(255, 255, 255, 255), 32),
];

const LOCAL_V6: [(Ipv6Addr, u8); 5] = [
    (Ipv6Addr::UNSPECIFIED, 128),
    (Ipv6Addr::LOCALHOST, 128),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
    (Ipv6Addr::new(0xff00, 0, 0, 0, 0, 0, 0, 0), 8),
];

/// Private, loopback, link-local, documentation or multicast source
pub fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => LOCAL_V4.iter().any(|&(net, len)| v4.masked(len) == net),
        IpAddr::V6(v6) => LOCAL_V6.iter().any(|&(net, len)| v6.masked(len) == net),
    }
}

/// What to do with a source that hits an indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Record a disabled rule for review
    Monitor,
    /// Block on the first hit
    Block,
    /// Block after repeated hits within a window
    Threshold,
}

impl MatchMode {
    /// Stable name used in logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Block => "block",
            Self::Threshold => "threshold",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threat-intel matcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelConfig {
    /// Skip private and reserved sources
    pub ignore_local_network: bool,
    /// Action on an indicator hit
    pub match_mode: MatchMode,
    /// Hits within the window before blocking, threshold mode only
    pub match_threshold: u32,
    /// Counting window in seconds
    pub match_window_secs: u64,
    /// TTL of created rules in seconds, zero for none
    pub block_duration_secs: u64,
    /// Indicator limit per address family
    pub max_indicators: usize,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            ignore_local_network: true,
            match_mode: MatchMode::Threshold,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            match_window_secs: DEFAULT_MATCH_WINDOW_SECS,
            block_duration_secs: DEFAULT_BLOCK_DURATION_SECS,
            max_indicators: DEFAULT_MAX_INDICATORS,
        }
    }
}

impl IntelConfig {
    /// Reject a zero threshold, window or indicator limit
    pub fn validate(&self) -> FwResult<()> {
        if self.match_threshold == 0 {
            return Err(FwError::ConfigError("match_threshold must be greater than zero".into()));
        }
        if self.match_window_secs == 0 {
            return Err(FwError::ConfigError("match_window_secs must be greater than zero".into()));
        }
        if self.max_indicators == 0 {
            return Err(FwError::ConfigError("max_indicators must be greater than zero".into()));
        }
        if self.match_window_secs > MAX_DURATION_SECS || self.block_duration_secs > MAX_DURATION_SECS {
            return Err(FwError::ConfigError(format!(
                "durations must not exceed {MAX_DURATION_SECS} seconds"
            )));
        }
        Ok(())
    }

    fn window(&self) -> Duration {
        seconds(self.match_window_secs)
    }

    fn block_duration(&self) -> Option<Duration> {
        (self.block_duration_secs > 0).then(|| seconds(self.block_duration_secs))
    }
}

/// Validated configs stay within [`MAX_DURATION_SECS`]
fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs.min(MAX_DURATION_SECS)).unwrap_or(0))
}

/// Outcome of inspecting one audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntelAction {
    /// Not eligible or not an indicator
    Miss,
    /// Indicator hit counted, threshold not reached
    Counted(u32),
    /// Source already reported in this window
    AlreadyReported,
    /// Disabled rule recorded (monitor mode)
    Recorded(Uuid),
    /// Rule installed
    Blocked(Uuid),
    /// The blocklist refused the rule
    Rejected,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    first_seen: DateTime<Utc>,
    reported: bool,
}

struct Indicators {
    v4: LpmTrie<Ipv4Addr>,
    v6: LpmTrie<Ipv6Addr>,
}

/// Turns indicator hits in the audit stream into block rules
pub struct ThreatIntel {
    config: IntelConfig,
    blocklist: Arc<Blocklist>,
    indicators: RwLock<Indicators>,
    windows: DashMap<IpAddr, WindowState>,
    hits: AtomicCounter,
    rules_created: AtomicCounter,
}

impl ThreatIntel {
    /// Matcher feeding rules into `blocklist`
    pub fn new(config: IntelConfig, blocklist: Arc<Blocklist>) -> FwResult<Self> {
        config.validate()?;
        let indicators = Indicators {
            v4: LpmTrie::new(Table::Ipv4Cidr, config.max_indicators),
            v6: LpmTrie::new(Table::Ipv6Cidr, config.max_indicators),
        };
        info!(mode = %config.match_mode, threshold = config.match_threshold, "threat intel matcher ready");
        Ok(Self {
            config,
            blocklist,
            indicators: RwLock::new(indicators),
            windows: DashMap::new(),
            hits: AtomicCounter::new(0),
            rules_created: AtomicCounter::new(0),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &IntelConfig {
        &self.config
    }

    /// Add an address or CIDR indicator
    ///
    /// Returns `Ok(false)` if it was already listed. MAC addresses are not
    /// indicators.
    pub fn add_indicator(&self, text: &str) -> FwResult<bool> {
        let key: RuleKey = text.parse()?;
        let mut indicators = self.indicators.write();
        match key {
            RuleKey::Ipv4(addr) => indicators.v4.insert(addr, <Ipv4Addr as PrefixKey>::BITS),
            RuleKey::Ipv4Cidr { addr, prefix_len } => indicators.v4.insert(addr, prefix_len),
            RuleKey::Ipv6(addr) => indicators.v6.insert(addr, <Ipv6Addr as PrefixKey>::BITS),
            RuleKey::Ipv6Cidr { addr, prefix_len } => indicators.v6.insert(addr, prefix_len),
            RuleKey::Mac(_) => Err(FwError::InvalidRule(format!("{text}: indicators must be IP addresses"))),
        }
    }

    /// Add indicators one per line, skipping blanks and `#` comments
    ///
    /// Stops at the first invalid line; returns how many were new.
    pub fn load_indicators(&self, text: &str) -> FwResult<usize> {
        let mut added = 0;
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if self.add_indicator(line)? {
                added += 1;
            }
        }
        info!(added, total = self.indicator_count(), "indicators loaded");
        Ok(added)
    }

    /// Drop every indicator
    pub fn clear_indicators(&self) {
        let mut indicators = self.indicators.write();
        indicators.v4 = LpmTrie::new(Table::Ipv4Cidr, self.config.max_indicators);
        indicators.v6 = LpmTrie::new(Table::Ipv6Cidr, self.config.max_indicators);
    }

    /// `ip` is covered by an indicator
    pub fn contains(&self, ip: IpAddr) -> bool {
        let indicators = self.indicators.read();
        match ip {
            IpAddr::V4(v4) => indicators.v4.lookup(v4),
            IpAddr::V6(v6) => indicators.v6.lookup(v6),
        }
    }

    /// Indicators across both families
    pub fn indicator_count(&self) -> usize {
        let indicators = self.indicators.read();
        indicators.v4.len() + indicators.v6.len()
    }

    /// Inspect one audit record
    pub fn inspect(&self, record: &AuditRecord) -> IntelAction {
        self.inspect_at(record, Utc::now())
    }

    fn inspect_at(&self, record: &AuditRecord, now: DateTime<Utc>) -> IntelAction {
        // frames already discarded are covered by a rule
        if record.match_kind().is_match() {
            return IntelAction::Miss;
        }
        let Some(ip) = record.descriptor().src_ip().filter(|ip| !ip.is_unspecified()) else {
            return IntelAction::Miss;
        };
        if self.config.ignore_local_network && is_local(ip) {
            return IntelAction::Miss;
        }
        if !self.contains(ip) {
            return IntelAction::Miss;
        }
        self.hits.inc();

        let window = self.config.window();
        let count = {
            let mut state = self.windows.entry(ip).or_insert(WindowState {
                count: 0,
                first_seen: now,
                reported: false,
            });
            if now - state.first_seen > window {
                *state = WindowState {
                    count: 0,
                    first_seen: now,
                    reported: false,
                };
            }
            state.count = state.count.saturating_add(1);
            if state.reported {
                return IntelAction::AlreadyReported;
            }
            if self.config.match_mode == MatchMode::Threshold && state.count < self.config.match_threshold {
                debug!(%ip, count = state.count, "indicator hit counted");
                return IntelAction::Counted(state.count);
            }
            state.reported = true;
            state.count
        };

        self.report(ip, count, now)
    }

    fn report(&self, ip: IpAddr, count: u32, now: DateTime<Utc>) -> IntelAction {
        let mut rule = BlockRule::new(ip.to_string(), BlockSource::Intel).with_note(INTEL_RULE_NOTE);
        if let Some(duration) = self.config.block_duration() {
            rule = rule.with_expiry(now + duration);
        }
        let monitor = self.config.match_mode == MatchMode::Monitor;
        if monitor {
            rule = rule.disabled();
        }

        match self.blocklist.add(rule) {
            Ok(id) => {
                self.rules_created.inc();
                info!(%ip, %id, count, mode = %self.config.match_mode, "threat intel rule created");
                if monitor {
                    IntelAction::Recorded(id)
                } else {
                    IntelAction::Blocked(id)
                }
            }
            Err(e) => {
                // let the next hit try again
                if let Some(mut state) = self.windows.get_mut(&ip) {
                    state.reported = false;
                }
                warn!(%ip, error = %e, "threat intel rule rejected");
                IntelAction::Rejected
            }
        }
    }

    /// Forget windows that started more than one window ago
    pub fn cleanup_windows(&self) -> usize {
        self.cleanup_windows_at(Utc::now())
    }

    fn cleanup_windows_at(&self, now: DateTime<Utc>) -> usize {
        let window = self.config.window();
        let before = self.windows.len();
        self.windows.retain(|_, state| now - state.first_seen <= window);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, "threat intel windows expired");
        }
        removed
    }

    /// Sources with an open window
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Indicator hits seen
    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    /// Rules handed to the blocklist
    pub fn rules_created(&self) -> u64 {
        self.rules_created.get()
    }
}

impl fmt::Debug for ThreatIntel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreatIntel")
            .field("config", &self.config)
            .field("indicators", &self.indicator_count())
            .field("windows", &self.windows.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_common::packet::{ETH_P_IP, ETH_P_IPV6};
    use fw_common::{MatchKind, PacketDescriptor};
    use fw_rules::RuleStore;

    fn record(src: &str, kind: MatchKind) -> AuditRecord {
        let ip: IpAddr = src.parse().unwrap();
        let mut desc = PacketDescriptor {
            match_kind: kind,
            length: 60,
            ..Default::default()
        };
        match ip {
            IpAddr::V4(v4) => {
                desc.ether_type = ETH_P_IP;
                desc.src_ipv4 = v4;
            }
            IpAddr::V6(v6) => {
                desc.ether_type = ETH_P_IPV6;
                desc.src_ipv6 = v6;
            }
        }
        AuditRecord::new(desc)
    }

    fn intel(config: IntelConfig) -> (ThreatIntel, Arc<Blocklist>) {
        let blocklist = Arc::new(Blocklist::new(Arc::new(RuleStore::new())));
        let intel = ThreatIntel::new(config, blocklist.clone()).unwrap();
        intel.load_indicators("# feed\n203.0.114.0/24\n\n45.33.32.156\n2a00:1450::/32\n").unwrap();
        (intel, blocklist)
    }

    fn key(text: &str) -> RuleKey {
        text.parse().unwrap()
    }

    #[test]
    fn test_threshold_blocks_on_nth_hit() {
        let (intel, blocklist) = intel(IntelConfig::default());
        let now = Utc::now();
        let hit = record("45.33.32.156", MatchKind::Pass);

        assert_eq!(intel.inspect_at(&hit, now), IntelAction::Counted(1));
        assert_eq!(intel.inspect_at(&hit, now + Duration::minutes(1)), IntelAction::Counted(2));
        assert!(blocklist.is_empty());

        let IntelAction::Blocked(id) = intel.inspect_at(&hit, now + Duration::minutes(2)) else {
            panic!("third hit should block");
        };
        let rule = blocklist.get(id).unwrap();
        assert_eq!(rule.source, BlockSource::Intel);
        assert_eq!(rule.note, INTEL_RULE_NOTE);
        assert!(rule.enabled);
        assert!(blocklist.store().contains(&key("45.33.32.156")));

        // no duplicate rule for the same window
        assert_eq!(intel.inspect_at(&hit, now + Duration::minutes(3)), IntelAction::AlreadyReported);
        assert_eq!(blocklist.len(), 1);
        assert_eq!(intel.hits(), 4);
        assert_eq!(intel.rules_created(), 1);
    }

    #[test]
    fn test_threshold_window_restarts() {
        let (intel, blocklist) = intel(IntelConfig {
            match_threshold: 2,
            match_window_secs: 60,
            ..Default::default()
        });
        let now = Utc::now();
        let hit = record("203.0.114.9", MatchKind::Pass);

        assert_eq!(intel.inspect_at(&hit, now), IntelAction::Counted(1));
        // second hit lands after the window closed
        assert_eq!(intel.inspect_at(&hit, now + Duration::seconds(61)), IntelAction::Counted(1));
        assert!(matches!(intel.inspect_at(&hit, now + Duration::seconds(62)), IntelAction::Blocked(_)));
        assert!(blocklist.store().contains(&key("203.0.114.9")));
    }

    #[test]
    fn test_block_mode_blocks_at_once() {
        let (intel, blocklist) = intel(IntelConfig {
            match_mode: MatchMode::Block,
            ..Default::default()
        });
        let out = intel.inspect(&record("2a00:1450::7", MatchKind::Pass));
        assert!(matches!(out, IntelAction::Blocked(_)));
        assert!(blocklist.store().contains(&key("2a00:1450::7")));
    }

    #[test]
    fn test_monitor_mode_records_disabled_rule() {
        let (intel, blocklist) = intel(IntelConfig {
            match_mode: MatchMode::Monitor,
            ..Default::default()
        });
        let IntelAction::Recorded(id) = intel.inspect(&record("45.33.32.156", MatchKind::Pass)) else {
            panic!("monitor mode should record");
        };
        assert!(!blocklist.get(id).unwrap().enabled);
        assert_eq!(blocklist.store().load_full().total(), 0);
    }

    #[test]
    fn test_block_expires_after_duration() {
        let (intel, blocklist) = intel(IntelConfig {
            match_mode: MatchMode::Block,
            block_duration_secs: 60,
            ..Default::default()
        });
        let now = Utc::now();
        let IntelAction::Blocked(id) = intel.inspect_at(&record("45.33.32.156", MatchKind::Pass), now) else {
            panic!("block mode should block");
        };
        assert_eq!(blocklist.get(id).unwrap().expires_at, Some(now + Duration::seconds(60)));

        assert_eq!(blocklist.sweep_expired(now + Duration::seconds(30)), 0);
        assert!(blocklist.store().contains(&key("45.33.32.156")));
        assert_eq!(blocklist.sweep_expired(now + Duration::seconds(61)), 1);
        assert!(!blocklist.store().contains(&key("45.33.32.156")));
    }

    #[test]
    fn test_zero_duration_never_expires() {
        let (intel, blocklist) = intel(IntelConfig {
            match_mode: MatchMode::Block,
            block_duration_secs: 0,
            ..Default::default()
        });
        let IntelAction::Blocked(id) = intel.inspect(&record("45.33.32.156", MatchKind::Pass)) else {
            panic!("block mode should block");
        };
        assert_eq!(blocklist.get(id).unwrap().expires_at, None);
    }

    #[test]
    fn test_ineligible_records_are_missed() {
        let (intel, blocklist) = intel(IntelConfig {
            match_mode: MatchMode::Block,
            ..Default::default()
        });
        intel.add_indicator("10.0.0.0/8").unwrap();

        // already discarded
        assert_eq!(intel.inspect(&record("45.33.32.156", MatchKind::Ipv4Exact)), IntelAction::Miss);
        // not an indicator
        assert_eq!(intel.inspect(&record("8.8.8.8", MatchKind::Pass)), IntelAction::Miss);
        // local source with local traffic ignored
        assert_eq!(intel.inspect(&record("10.1.2.3", MatchKind::Pass)), IntelAction::Miss);
        // no IP header
        assert_eq!(intel.inspect(&AuditRecord::new(PacketDescriptor::ZERO)), IntelAction::Miss);
        assert!(blocklist.is_empty());
        assert_eq!(intel.hits(), 0);
    }

    #[test]
    fn test_local_sources_checked_when_not_ignored() {
        let (intel, _) = intel(IntelConfig {
            match_mode: MatchMode::Block,
            ignore_local_network: false,
            ..Default::default()
        });
        intel.add_indicator("10.0.0.0/8").unwrap();
        assert!(matches!(intel.inspect(&record("10.1.2.3", MatchKind::Pass)), IntelAction::Blocked(_)));
    }

    #[test]
    fn test_cleanup_windows() {
        let (intel, _) = intel(IntelConfig {
            match_window_secs: 60,
            ..Default::default()
        });
        let now = Utc::now();
        intel.inspect_at(&record("45.33.32.156", MatchKind::Pass), now - Duration::seconds(120));
        intel.inspect_at(&record("203.0.114.1", MatchKind::Pass), now - Duration::seconds(30));
        assert_eq!(intel.window_count(), 2);

        assert_eq!(intel.cleanup_windows_at(now), 1);
        assert_eq!(intel.window_count(), 1);
        assert_eq!(intel.cleanup_windows_at(now + Duration::seconds(31)), 1);
        assert_eq!(intel.window_count(), 0);
    }

    #[test]
    fn test_rejected_rule_is_retried() {
        let blocklist = Arc::new(Blocklist::new(Arc::new(RuleStore::with_capacities(
            fw_rules::TableCapacities::uniform(1),
        ))));
        blocklist.add(BlockRule::new("1.1.1.1", BlockSource::User)).unwrap();
        let intel = ThreatIntel::new(
            IntelConfig {
                match_mode: MatchMode::Block,
                ..Default::default()
            },
            blocklist.clone(),
        )
        .unwrap();
        intel.add_indicator("45.33.32.156").unwrap();

        let hit = record("45.33.32.156", MatchKind::Pass);
        assert_eq!(intel.inspect(&hit), IntelAction::Rejected);
        blocklist.store().remove(&key("1.1.1.1"));
        assert!(matches!(intel.inspect(&hit), IntelAction::Blocked(_)));
    }

    #[test]
    fn test_indicator_parsing() {
        let (intel, _) = intel(IntelConfig::default());
        assert_eq!(intel.indicator_count(), 3);
        assert!(intel.contains("203.0.114.200".parse().unwrap()));
        assert!(!intel.contains("203.0.115.1".parse().unwrap()));
        assert!(intel.contains("2a00:1450:4001::1".parse().unwrap()));

        assert!(!intel.add_indicator("45.33.32.156").unwrap());
        assert!(matches!(intel.add_indicator("02:00:00:00:00:01"), Err(FwError::InvalidRule(_))));
        assert!(intel.load_indicators("1.2.3.4\nnot-an-ip\n").is_err());
        assert!(intel.contains("1.2.3.4".parse().unwrap()));

        intel.clear_indicators();
        assert_eq!(intel.indicator_count(), 0);
    }

    #[test]
    fn test_is_local() {
        for ip in ["10.1.1.1", "192.168.0.1", "100.64.1.1", "127.0.0.1", "255.255.255.255", "::1", "fe80::1", "fd00::5"] {
            assert!(is_local(ip.parse().unwrap()), "{ip}");
        }
        for ip in ["8.8.8.8", "45.33.32.156", "2a00:1450::1"] {
            assert!(!is_local(ip.parse().unwrap()), "{ip}");
        }
    }

    #[test]
    fn test_config_validation_and_json() {
        assert!(IntelConfig::default().validate().is_ok());
        let zero = IntelConfig {
            match_threshold: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        let forever = IntelConfig {
            block_duration_secs: u64::MAX,
            ..Default::default()
        };
        assert!(forever.validate().is_err());

        let config: IntelConfig = serde_json::from_str(r#"{"match_mode": "block", "block_duration_secs": 0}"#).unwrap();
        assert_eq!(config.match_mode, MatchMode::Block);
        assert_eq!(config.block_duration_secs, 0);
        assert_eq!(config.match_threshold, DEFAULT_MATCH_THRESHOLD);
    }
}
