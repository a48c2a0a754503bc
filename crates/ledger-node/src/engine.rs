//! The ledger engine: shared [`Ledger`] state, mining on a blocking thread,
//! conflict resolution against peers and fire-and-forget notifications.
use crate::peer::PeerClient;
use ledger_core::{
    consensus::{best_candidate, should_replace, ChainSnapshot, LengthPolicy},
    mine::{self, Tip},
    pow::hash_is_valid,
    Block, Hash, Ledger, LedgerError, MineError, PeerAddr, Transaction,
};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Mine(#[from] MineError),

    #[error("mining worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub length_policy: LengthPolicy,
    /// Upper bound of the nonce search; `None` searches without limit.
    pub max_nonce: Option<u64>,
}

/// Cancellation context of a continuous mining session.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Engine {
    node_id: PeerAddr,
    ledger: RwLock<Ledger>,
    /// Mirror of the chain length, read by the nonce search without locking.
    height: AtomicUsize,
    peers: Arc<dyn PeerClient>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(node_id: PeerAddr, peers: Arc<dyn PeerClient>, config: EngineConfig) -> Arc<Self> {
        Self::with_ledger(Ledger::new(node_id), peers, config)
    }

    pub fn with_ledger(
        ledger: Ledger,
        peers: Arc<dyn PeerClient>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            node_id: ledger.node_id().clone(),
            height: AtomicUsize::new(ledger.height()),
            ledger: RwLock::new(ledger),
            peers,
            config,
        })
    }

    pub fn node_id(&self) -> &PeerAddr {
        &self.node_id
    }

    pub async fn chain(&self) -> ChainSnapshot {
        ChainSnapshot::new(self.ledger.read().await.chain().to_vec())
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.ledger.read().await.pending().to_vec()
    }

    pub async fn nodes(&self) -> Vec<PeerAddr> {
        self.ledger.read().await.nodes().snapshot()
    }

    /// Queues a transaction; returns the index of the block it should land in.
    pub async fn new_transaction(&self, tx: Transaction) -> u64 {
        debug!(data = %tx.data, "new transaction");
        self.ledger.write().await.new_transaction(tx)
    }

    /// Adds a peer. A newly added peer is told our address in the background.
    pub async fn register_node(&self, addr: PeerAddr) -> bool {
        let inserted = self.ledger.write().await.register_node(addr.clone());
        if inserted {
            let client = Arc::clone(&self.peers);
            let own = self.node_id.clone();
            tokio::spawn(async move {
                if let Err(e) = client.announce(&addr, &own).await {
                    debug!(node = %addr, error = %e, "announce failed");
                }
            });
        }
        inserted
    }

    /// Mines one block out of the whole pending pool and appends it.
    ///
    /// The nonce search runs on a blocking thread. When the chain changes
    /// underneath it the candidate is moved onto the new tip and the search
    /// continues.
    pub async fn mine(self: &Arc<Self>) -> Result<Block, EngineError> {
        let mut candidate = self.ledger.write().await.next_candidate();
        debug!(
            index = candidate.index,
            txs = candidate.transactions.len(),
            "start mining"
        );

        let (hash, peers) = loop {
            let engine = Arc::clone(self);
            let (searched, result) = tokio::task::spawn_blocking(move || {
                let result = engine.search(&mut candidate);
                (candidate, result)
            })
            .await?;
            candidate = searched;

            let mut ledger = self.ledger.write().await;
            let hash = match result {
                Ok(hash) => hash,
                Err(e) => {
                    ledger.restore_pending(candidate.transactions);
                    return Err(e.into());
                }
            };
            match ledger.append(candidate.clone()) {
                Ok(()) => {
                    self.height.store(ledger.height(), Ordering::Release);
                    break (hash, ledger.nodes().snapshot());
                }
                Err(LedgerError::StaleTip { .. }) => {
                    let tip = ledger.tip();
                    debug!(index = tip.index, "tip moved before append, continuing search");
                    candidate.index = tip.index;
                    candidate.previous_hash = tip.previous_hash;
                }
                Err(e) => {
                    ledger.restore_pending(candidate.transactions);
                    return Err(e.into());
                }
            }
        };

        info!(
            index = candidate.index,
            nonce = candidate.nonce,
            %hash,
            txs = candidate.transactions.len(),
            "mined block"
        );
        self.broadcast_resolve(peers);
        Ok(candidate)
    }

    fn search(&self, candidate: &mut Block) -> Result<Hash, MineError> {
        let mut observed = self.height.load(Ordering::Acquire);
        mine::search(candidate, hash_is_valid, self.config.max_nonce, || {
            if self.height.load(Ordering::Acquire) == observed {
                return None;
            }
            let ledger = self.ledger.blocking_read();
            observed = ledger.height();
            let tip: Tip = ledger.tip();
            debug!(index = tip.index, "chain changed during mining, rebasing");
            Some(tip)
        })
    }

    /// Mines blocks back to back until `stop` is raised. The signal is checked
    /// between blocks, never in the middle of a search.
    pub async fn mine_continuously(self: &Arc<Self>, stop: StopSignal) -> Result<u64, EngineError> {
        let mut mined = 0;
        while !stop.is_stopped() {
            self.mine().await?;
            mined += 1;
        }
        info!(mined, "continuous mining stopped");
        Ok(mined)
    }

    /// Replaces our chain with the longest valid peer chain when it is longer
    /// than ours, or when ours is invalid. Unreachable or misbehaving peers
    /// are skipped.
    ///
    /// Chains are validated on the blocking pool without holding the ledger
    /// lock; the write lock is only taken to swap, and only if the local
    /// chain is still the one the decision was made against.
    pub async fn resolve_conflicts(&self) -> bool {
        let peers = self.ledger.read().await.nodes().snapshot();
        debug!(peers = peers.len(), "resolving conflicts");

        let mut candidates = Vec::with_capacity(peers.len());
        for peer in &peers {
            match self.peers.fetch_chain(peer).await {
                Ok(snapshot) => candidates.push((peer.clone(), snapshot)),
                Err(e) => debug!(node = %peer, error = %e, "skipping peer"),
            }
        }

        let policy = self.config.length_policy;
        let validated = tokio::task::spawn_blocking(move || best_candidate(candidates, policy)).await;
        let best = match validated {
            Ok(Some(best)) => best,
            Ok(None) => {
                info!("chain is authoritative");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "validating peer chains failed");
                return false;
            }
        };

        let peers = loop {
            let local = self.ledger.read().await.chain().to_vec();
            let length = best.length;
            let (local, replace) = match tokio::task::spawn_blocking(move || {
                let replace = should_replace(&local, length);
                (local, replace)
            })
            .await
            {
                Ok(checked) => checked,
                Err(e) => {
                    warn!(error = %e, "validating local chain failed");
                    return false;
                }
            };
            if !replace {
                info!("chain is authoritative");
                return false;
            }

            let mut ledger = self.ledger.write().await;
            if ledger.height() != local.len() || ledger.chain().last() != local.last() {
                debug!("chain changed during resolution, checking again");
                continue;
            }
            if !ledger.replace_chain(best.chain) {
                return false;
            }
            self.height.store(ledger.height(), Ordering::Release);
            info!(from = %best.peer, length = ledger.height(), "chain was replaced");
            break ledger.nodes().snapshot();
        };

        self.broadcast_resolve(peers);
        true
    }

    fn broadcast_resolve(&self, peers: Vec<PeerAddr>) {
        for peer in peers {
            let client = Arc::clone(&self.peers);
            tokio::spawn(async move {
                if let Err(e) = client.notify_resolve(&peer).await {
                    debug!(node = %peer, error = %e, "resolve notification failed");
                }
            });
        }
    }
}
