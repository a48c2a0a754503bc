//! Longest-valid-chain rule used when resolving conflicts with peers.
use crate::{chain::is_valid, nodes::PeerAddr, Block};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// A chain as reported by `GET /chain`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: u64,
}

impl ChainSnapshot {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len() as u64;
        Self { chain, length }
    }
}

/// How the length of a peer's chain is determined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LengthPolicy {
    /// Take the `length` field the peer sent.
    #[default]
    Reported,
    /// Count the blocks actually received.
    Recomputed,
}

impl LengthPolicy {
    pub fn length_of(self, snapshot: &ChainSnapshot) -> u64 {
        match self {
            LengthPolicy::Reported => snapshot.length,
            LengthPolicy::Recomputed => snapshot.chain.len() as u64,
        }
    }
}

impl FromStr for LengthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reported" => Ok(LengthPolicy::Reported),
            "recomputed" => Ok(LengthPolicy::Recomputed),
            other => Err(format!(
                "unknown length policy `{other}` (expected `reported` or `recomputed`)"
            )),
        }
    }
}

impl fmt::Display for LengthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LengthPolicy::Reported => "reported",
            LengthPolicy::Recomputed => "recomputed",
        })
    }
}

/// The chain that should replace ours.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacement {
    pub peer: PeerAddr,
    pub length: u64,
    pub chain: Vec<Block>,
}

/// Picks the longest valid chain among the peer candidates.
///
/// Candidates are considered in peer address order; a candidate becomes the
/// best one only if it is strictly longer than the best so far and valid, so
/// ties go to the first peer in that order. Every chain considered is fully
/// hashed, so callers on an async runtime should run this off the reactor.
pub fn best_candidate(
    mut candidates: Vec<(PeerAddr, ChainSnapshot)>,
    policy: LengthPolicy,
) -> Option<Replacement> {
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let mut best: Option<Replacement> = None;
    let mut max_len = 0;
    for (peer, snapshot) in candidates {
        let length = policy.length_of(&snapshot);
        if length <= max_len {
            continue;
        }
        if !is_valid(&snapshot.chain) {
            debug!(%peer, length, "ignoring invalid chain");
            continue;
        }
        max_len = length;
        best = Some(Replacement {
            peer,
            length,
            chain: snapshot.chain,
        });
    }
    best
}

/// Whether a valid chain of `length` blocks should replace `local`: it must
/// be longer, unless `local` itself fails validation.
pub fn should_replace(local: &[Block], length: u64) -> bool {
    length > local.len() as u64 || !is_valid(local)
}

/// Picks the peer chain that should replace `local`, if any.
pub fn choose_chain(
    local: &[Block],
    candidates: Vec<(PeerAddr, ChainSnapshot)>,
    policy: LengthPolicy,
) -> Option<Replacement> {
    match best_candidate(candidates, policy) {
        Some(best) => should_replace(local, best.length).then_some(best),
        None => {
            if !is_valid(local) {
                warn!("local chain is invalid and no peer offered a valid one");
            }
            None
        }
    }
}
