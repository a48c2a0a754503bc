use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod mine;
pub mod nodes;

pub use chain::{is_valid, Ledger};
pub use error::{LedgerError, MineError};
pub use nodes::{NodeSet, PeerAddr};

/// Hex-encoded SHA-256 digest of a block.
pub type Hash = String;

/// Opaque transaction payload. Nodes never look inside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub data: String,
}

impl Transaction {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// A block as hashed and as sent over the wire.
///
/// Field order is part of the hash: `serde_json` writes struct fields in
/// declaration order, so reordering these fields changes every digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub previous_hash: Hash,
}

impl Block {
    /// A fresh candidate stamped with the current time and a zero nonce.
    pub fn new(index: u64, previous_hash: Hash, transactions: Vec<Transaction>) -> Self {
        Self {
            index,
            timestamp: unix_now(),
            transactions,
            nonce: 0,
            previous_hash,
        }
    }

    pub fn genesis() -> Self {
        Self::new(1, constants::GENESIS_PREVIOUS_HASH.to_string(), Vec::new())
    }

    /// Compact JSON of the block; the input of [`Block::hash`].
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("block fields are plain strings and integers")
    }

    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hex::encode(hasher.finalize())
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub mod pow {
    use crate::constants::POW_PREFIX_ZEROS;

    /// The network's proof-of-work predicate: the digest starts with
    /// [`POW_PREFIX_ZEROS`] `0` characters.
    pub fn hash_is_valid(digest: &str) -> bool {
        has_zero_prefix(digest, POW_PREFIX_ZEROS)
    }

    pub fn has_zero_prefix(digest: &str, zeros: usize) -> bool {
        digest.len() >= zeros && digest.bytes().take(zeros).all(|b| b == b'0')
    }
}
