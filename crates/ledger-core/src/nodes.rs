//! Peer addresses and the set of peers a node talks to.
use crate::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A `host:port` peer address.
///
/// Ordering is by host, then numeric port; the node set iterates in this order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerAddr {
    host: String,
    port: u16,
}

impl PeerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL for outbound HTTP calls, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{self}")
    }
}

impl FromStr for PeerAddr {
    type Err = LedgerError;

    /// Accepts `host:port`, tolerating an `http://` scheme and a trailing `/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidPeerAddress(s.to_string());
        let trimmed = s.trim();
        let rest = trimmed.strip_prefix("http://").unwrap_or(trimmed);
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() || host.contains(|c: char| c == '/' || c.is_whitespace()) {
            return Err(invalid());
        }
        let port: u16 = port.parse().map_err(|_| invalid())?;
        if port == 0 {
            return Err(invalid());
        }
        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for PeerAddr {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeerAddr> for String {
    fn from(addr: PeerAddr) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Deduplicated, sorted set of known peers. Grows only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSet(BTreeSet<PeerAddr>);

impl NodeSet {
    /// Returns `true` when the address was not known before.
    pub fn insert(&mut self, addr: PeerAddr) -> bool {
        self.0.insert(addr)
    }

    pub fn contains(&self, addr: &PeerAddr) -> bool {
        self.0.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerAddr> {
        self.0.iter()
    }

    /// Owned copy in iteration order, for use after the ledger lock is released.
    pub fn snapshot(&self) -> Vec<PeerAddr> {
        self.0.iter().cloned().collect()
    }
}
