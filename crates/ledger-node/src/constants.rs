pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub(crate) const DEFAULT_PEER_TIMEOUT_MS: u64 = 5_000;

pub const MSG_NODES_ADDED: &str = "New nodes have been added";
pub const MSG_CHAIN_REPLACED: &str = "Our chain was replaced";
pub const MSG_CHAIN_AUTHORITATIVE: &str = "Our chain is authoritative";
