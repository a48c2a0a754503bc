#![allow(dead_code)]

use async_trait::async_trait;
use ledger_core::{consensus::ChainSnapshot, Block, Ledger, PeerAddr, Transaction};
use ledger_node::{PeerClient, PeerError};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

/// In-memory peers: serve fixed chains, fail on demand, record every call.
#[derive(Default)]
pub struct MockPeers {
    chains: Mutex<HashMap<PeerAddr, ChainSnapshot>>,
    failing: Mutex<HashSet<PeerAddr>>,
    resolves: Mutex<Vec<PeerAddr>>,
    announces: Mutex<Vec<(PeerAddr, PeerAddr)>>,
}

impl MockPeers {
    pub fn serve(&self, peer: PeerAddr, snapshot: ChainSnapshot) {
        self.chains.lock().unwrap().insert(peer, snapshot);
    }

    pub fn fail(&self, peer: PeerAddr) {
        self.failing.lock().unwrap().insert(peer);
    }

    pub fn resolves(&self) -> Vec<PeerAddr> {
        self.resolves.lock().unwrap().clone()
    }

    pub fn announces(&self) -> Vec<(PeerAddr, PeerAddr)> {
        self.announces.lock().unwrap().clone()
    }

    fn check(&self, peer: &PeerAddr) -> Result<(), PeerError> {
        if self.failing.lock().unwrap().contains(peer) {
            return Err(PeerError::Status {
                peer: peer.clone(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PeerClient for MockPeers {
    async fn fetch_chain(&self, peer: &PeerAddr) -> Result<ChainSnapshot, PeerError> {
        self.check(peer)?;
        self.chains
            .lock()
            .unwrap()
            .get(peer)
            .cloned()
            .ok_or_else(|| PeerError::Status {
                peer: peer.clone(),
                status: StatusCode::NOT_FOUND,
            })
    }

    async fn notify_resolve(&self, peer: &PeerAddr) -> Result<(), PeerError> {
        self.resolves.lock().unwrap().push(peer.clone());
        self.check(peer)
    }

    async fn announce(&self, peer: &PeerAddr, own: &PeerAddr) -> Result<(), PeerError> {
        self.announces.lock().unwrap().push((peer.clone(), own.clone()));
        self.check(peer)
    }
}

/// A valid six-block chain mined once per test binary. Its prefixes are valid chains too.
pub fn fixture_chain() -> &'static [Block] {
    static CHAIN: OnceLock<Vec<Block>> = OnceLock::new();
    CHAIN.get_or_init(|| {
        let mut ledger = Ledger::new(PeerAddr::new("fixture", 1));
        for i in 0..5 {
            ledger.new_transaction(Transaction::new(format!("fixture-{i}")));
            ledger.mine(None).expect("fixture mining is unbounded");
        }
        ledger.chain().to_vec()
    })
}

/// Breaks the linkage of the last block.
pub fn broken(mut chain: Vec<Block>) -> Vec<Block> {
    let last = chain.len() - 1;
    chain[last].previous_hash = "broken".into();
    chain
}

/// Polls `check` until it holds, for up to five seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
