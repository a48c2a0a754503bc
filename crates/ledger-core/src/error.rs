use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid peer address `{0}`: expected host:port")]
    InvalidPeerAddress(String),

    /// The block does not extend the current tip.
    #[error("block {index} does not extend the tip: expected previous hash {expected}, got {found}")]
    StaleTip {
        index: u64,
        expected: String,
        found: String,
    },

    #[error("block {index} does not meet the proof-of-work target")]
    InvalidProofOfWork { index: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MineError {
    #[error("no valid nonce found up to {max_nonce}")]
    NonceExhausted { max_nonce: u64 },
}
