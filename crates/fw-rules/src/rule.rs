//! Rule keys and their text form
//!
//! | Text                 | Table        |
//! |----------------------|--------------|
//! | `192.168.1.5`        | IPv4 exact   |
//! | `10.0.0.0/8`         | IPv4 CIDR    |
//! | `2001:db8::1`        | IPv6 exact   |
//! | `2001:db8::/32`      | IPv6 CIDR    |
//! | `aa:bb:cc:dd:ee:ff`  | MAC exact    |
//!
//! A `/32` (or `/128`) block stays a CIDR entry; it is not folded into the
//! exact table.

use crate::trie::PrefixKey;
use fw_common::{FwError, FwResult, MacAddr, Table, IPV4_FULL_PREFIX, IPV6_FULL_PREFIX};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Key selecting one rule table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleKey {
    /// Source MAC exact match
    Mac(MacAddr),
    /// Source IPv4 exact match
    Ipv4(Ipv4Addr),
    /// IPv4 network with host bits cleared
    Ipv4Cidr {
        /// Network address
        addr: Ipv4Addr,
        /// Prefix length, 1..=32
        prefix_len: u8,
    },
    /// Source IPv6 exact match
    Ipv6(Ipv6Addr),
    /// IPv6 network with host bits cleared
    Ipv6Cidr {
        /// Network address
        addr: Ipv6Addr,
        /// Prefix length, 1..=128
        prefix_len: u8,
    },
}

impl RuleKey {
    /// Validated IPv4 block, host bits masked
    pub fn ipv4_cidr(addr: Ipv4Addr, prefix_len: u8) -> FwResult<Self> {
        check_prefix(prefix_len, IPV4_FULL_PREFIX)?;
        Ok(Self::Ipv4Cidr {
            addr: addr.masked(prefix_len),
            prefix_len,
        })
    }

    /// Validated IPv6 block, host bits masked
    pub fn ipv6_cidr(addr: Ipv6Addr, prefix_len: u8) -> FwResult<Self> {
        check_prefix(prefix_len, IPV6_FULL_PREFIX)?;
        Ok(Self::Ipv6Cidr {
            addr: addr.masked(prefix_len),
            prefix_len,
        })
    }

    /// Exact key for a single address
    pub fn from_ip(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::Ipv4(v4),
            IpAddr::V6(v6) => Self::Ipv6(v6),
        }
    }

    /// CIDR key for a parsed network
    pub fn from_network(net: IpNetwork) -> FwResult<Self> {
        match net {
            IpNetwork::V4(v4) => Self::ipv4_cidr(v4.ip(), v4.prefix()),
            IpNetwork::V6(v6) => Self::ipv6_cidr(v6.ip(), v6.prefix()),
        }
    }

    /// Table this key lives in
    pub const fn table(&self) -> Table {
        match self {
            Self::Mac(_) => Table::Mac,
            Self::Ipv4(_) => Table::Ipv4Exact,
            Self::Ipv4Cidr { .. } => Table::Ipv4Cidr,
            Self::Ipv6(_) => Table::Ipv6Exact,
            Self::Ipv6Cidr { .. } => Table::Ipv6Cidr,
        }
    }
}

fn check_prefix(prefix_len: u8, max: u8) -> FwResult<()> {
    if prefix_len == 0 || prefix_len > max {
        return Err(FwError::InvalidPrefix {
            len: prefix_len,
            max,
        });
    }
    Ok(())
}

impl FromStr for RuleKey {
    type Err = FwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some((addr, len)) = s.split_once('/') {
            // out-of-range lengths get the precise error instead of a parse failure
            if let (Ok(ip), Ok(len)) = (addr.parse::<IpAddr>(), len.parse::<u8>()) {
                return match ip {
                    IpAddr::V4(v4) => Self::ipv4_cidr(v4, len),
                    IpAddr::V6(v6) => Self::ipv6_cidr(v6, len),
                };
            }
            let net = s
                .parse::<IpNetwork>()
                .map_err(|e| FwError::InvalidRule(format!("{s}: {e}")))?;
            return Self::from_network(net);
        }

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::from_ip(ip));
        }

        s.parse::<MacAddr>()
            .map(Self::Mac)
            .map_err(|_| FwError::InvalidRule(format!("not an address, CIDR block or MAC: {s}")))
    }
}

impl TryFrom<String> for RuleKey {
    type Error = FwError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleKey> for String {
    fn from(key: RuleKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mac(mac) => write!(f, "{mac}"),
            Self::Ipv4(addr) => write!(f, "{addr}"),
            Self::Ipv4Cidr { addr, prefix_len } => write!(f, "{addr}/{prefix_len}"),
            Self::Ipv6(addr) => write!(f, "{addr}"),
            Self::Ipv6Cidr { addr, prefix_len } => write!(f, "{addr}/{prefix_len}"),
        }
    }
}

impl From<MacAddr> for RuleKey {
    fn from(mac: MacAddr) -> Self {
        Self::Mac(mac)
    }
}

impl From<Ipv4Addr> for RuleKey {
    fn from(addr: Ipv4Addr) -> Self {
        Self::Ipv4(addr)
    }
}

impl From<Ipv6Addr> for RuleKey {
    fn from(addr: Ipv6Addr) -> Self {
        Self::Ipv6(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selects_table() {
        let cases = [
            ("192.168.1.5", Table::Ipv4Exact),
            ("10.0.0.0/8", Table::Ipv4Cidr),
            ("2001:db8::1", Table::Ipv6Exact),
            ("2001:db8::/32", Table::Ipv6Cidr),
            ("aa:bb:cc:dd:ee:ff", Table::Mac),
            ("  10.0.0.1/32 ", Table::Ipv4Cidr),
        ];
        for (text, table) in cases {
            let key: RuleKey = text.parse().unwrap();
            assert_eq!(key.table(), table, "{text}");
        }
    }

    #[test]
    fn test_cidr_masks_host_bits() {
        let key: RuleKey = "10.1.2.3/8".parse().unwrap();
        assert_eq!(
            key,
            RuleKey::Ipv4Cidr {
                addr: Ipv4Addr::new(10, 0, 0, 0),
                prefix_len: 8
            }
        );
        assert_eq!(key.to_string(), "10.0.0.0/8");

        let key: RuleKey = "2001:db8:ffff::1/32".parse().unwrap();
        assert_eq!(key.to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_invalid_prefix_lengths() {
        for text in ["10.0.0.0/0", "10.0.0.0/33", "::/0", "2001:db8::/129"] {
            assert!(
                matches!(text.parse::<RuleKey>(), Err(FwError::InvalidPrefix { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn test_invalid_text() {
        for text in ["", "bogus", "10.0.0", "10.0.0.0/x", "aa:bb:cc"] {
            assert!(
                matches!(text.parse::<RuleKey>(), Err(FwError::InvalidRule(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn test_serde_as_text() {
        let key: RuleKey = "2001:db8::/32".parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2001:db8::/32\"");
        assert_eq!(serde_json::from_str::<RuleKey>(&json).unwrap(), key);
        assert!(serde_json::from_str::<RuleKey>("\"nope\"").is_err());
    }
}
