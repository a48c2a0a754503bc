//! A proof-of-work ledger node: the concurrent engine around `ledger-core`,
//! its peer client and its HTTP front door.
pub mod api;
pub mod config;
pub mod constants;
pub mod engine;
pub mod peer;

pub use api::{router, serve, AppState};
pub use config::Args;
pub use engine::{Engine, EngineConfig, EngineError, StopSignal};
pub use peer::{HttpPeerClient, PeerClient, PeerError};
