use crate::{
    constants::{DEFAULT_LISTEN, DEFAULT_PEER_TIMEOUT_MS},
    engine::EngineConfig,
};
use clap::Parser;
use ledger_core::{consensus::LengthPolicy, PeerAddr};
use std::{net::SocketAddr, time::Duration};

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// host:port other nodes use to reach us (defaults to the listen address)
    #[arg(long)]
    pub advertise: Option<PeerAddr>,

    /// Peer to register at start-up; may be repeated
    #[arg(long = "peer")]
    pub peers: Vec<PeerAddr>,

    /// Whether a peer's chain length is taken from its `length` field or counted
    #[arg(long, default_value_t = LengthPolicy::Reported)]
    pub length_policy: LengthPolicy,

    /// Timeout for each outbound peer request, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_MS)]
    pub peer_timeout_ms: u64,

    /// Give up mining after this nonce
    #[arg(long, hide = true)]
    pub max_nonce: Option<u64>,
}

impl Args {
    /// The address announced to peers.
    pub fn node_id(&self) -> PeerAddr {
        self.advertise
            .clone()
            .unwrap_or_else(|| PeerAddr::new(self.listen.ip().to_string(), self.listen.port()))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            length_policy: self.length_policy,
            max_nonce: self.max_nonce,
        }
    }
}
