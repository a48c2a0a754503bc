use crate::{
    mine::{mine_block, Tip},
    nodes::{NodeSet, PeerAddr},
    pow::hash_is_valid,
    Block, LedgerError, MineError, Transaction,
};
use rayon::prelude::*;
use tracing::{info, warn};

/// Checks linkage and proof-of-work of every block after genesis.
///
/// An empty chain is invalid; a genesis-only chain is valid.
pub fn is_valid(chain: &[Block]) -> bool {
    if chain.is_empty() {
        return false;
    }
    chain.par_windows(2).all(|pair| {
        let (prev, block) = (&pair[0], &pair[1]);
        block.previous_hash == prev.hash() && hash_is_valid(&block.hash())
    })
}

/// State of one node: its chain, the pending pool, its peers and its own address.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    nodes: NodeSet,
    node_id: PeerAddr,
}

impl Ledger {
    pub fn new(node_id: PeerAddr) -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            nodes: NodeSet::default(),
            node_id,
        }
    }

    pub fn node_id(&self) -> &PeerAddr {
        &self.node_id
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Number of blocks, genesis included.
    pub fn height(&self) -> usize {
        self.chain.len()
    }

    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain always holds genesis")
    }

    /// Where the next mined block goes.
    pub fn tip(&self) -> Tip {
        Tip {
            index: self.chain.len() as u64 + 1,
            previous_hash: self.last_block().hash(),
        }
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    /// Queues a transaction and returns the index of the block expected to carry it.
    pub fn new_transaction(&mut self, tx: Transaction) -> u64 {
        self.pending.push(tx);
        self.tip().index
    }

    /// Returns `true` only for a peer that was not known yet. Our own address is never added.
    pub fn register_node(&mut self, addr: PeerAddr) -> bool {
        if addr == self.node_id {
            return false;
        }
        let inserted = self.nodes.insert(addr.clone());
        if inserted {
            info!(node = %addr, total = self.nodes.len(), "registered node");
        }
        inserted
    }

    /// Builds the next candidate block, moving the whole pending pool into it.
    pub fn next_candidate(&mut self) -> Block {
        let tip = self.tip();
        Block::new(tip.index, tip.previous_hash, std::mem::take(&mut self.pending))
    }

    /// Puts transactions of an abandoned candidate back in front of the pool.
    pub fn restore_pending(&mut self, txs: Vec<Transaction>) {
        self.pending.splice(0..0, txs);
    }

    /// Appends a mined block that extends the current tip.
    pub fn append(&mut self, block: Block) -> Result<(), LedgerError> {
        let expected = self.last_block().hash();
        if block.previous_hash != expected {
            return Err(LedgerError::StaleTip {
                index: block.index,
                expected,
                found: block.previous_hash,
            });
        }
        if !hash_is_valid(&block.hash()) {
            return Err(LedgerError::InvalidProofOfWork { index: block.index });
        }
        self.chain.push(block);
        Ok(())
    }

    /// Swaps in a chain chosen by conflict resolution. Empty chains are ignored.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> bool {
        if chain.is_empty() {
            warn!("refusing to replace chain with an empty one");
            return false;
        }
        self.chain = chain;
        true
    }

    /// Single-threaded mining: draw a candidate, search, append.
    ///
    /// If the search gives up, the drawn transactions go back to the pool.
    pub fn mine(&mut self, max_nonce: Option<u64>) -> Result<Block, MineError> {
        let candidate = self.next_candidate();
        let txs = candidate.transactions.clone();
        match mine_block(candidate, max_nonce) {
            Ok((block, hash)) => {
                self.chain.push(block.clone());
                info!(index = block.index, nonce = block.nonce, %hash, "mined block");
                Ok(block)
            }
            Err(e) => {
                self.restore_pending(txs);
                Err(e)
            }
        }
    }
}
