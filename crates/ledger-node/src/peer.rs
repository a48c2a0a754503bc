//! Outbound calls to other nodes.
use crate::api::RegisterNodes;
use async_trait::async_trait;
use ledger_core::{consensus::ChainSnapshot, PeerAddr};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeerError {
    #[error("request to {peer} failed: {source}")]
    Transport {
        peer: PeerAddr,
        #[source]
        source: reqwest::Error,
    },

    #[error("{peer} answered with status {status}")]
    Status { peer: PeerAddr, status: StatusCode },

    #[error("{peer} sent an unreadable body: {source}")]
    Decode {
        peer: PeerAddr,
        #[source]
        source: reqwest::Error,
    },
}

/// What the engine needs from the network.
#[async_trait]
pub trait PeerClient: Send + Sync + 'static {
    /// `GET /chain` on the peer.
    async fn fetch_chain(&self, peer: &PeerAddr) -> Result<ChainSnapshot, PeerError>;

    /// Asks the peer to run conflict resolution (`GET /nodes/resolve`).
    async fn notify_resolve(&self, peer: &PeerAddr) -> Result<(), PeerError>;

    /// Tells the peer about us (`POST /nodes/register`).
    async fn announce(&self, peer: &PeerAddr, own: &PeerAddr) -> Result<(), PeerError>;
}

/// [`PeerClient`] over HTTP/JSON with a per-request timeout.
#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    http: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    fn check(peer: &PeerAddr, res: Response) -> Result<Response, PeerError> {
        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            Err(PeerError::Status {
                peer: peer.clone(),
                status,
            })
        }
    }

    async fn get(&self, peer: &PeerAddr, path: &str) -> Result<Response, PeerError> {
        let res = self
            .http
            .get(format!("{}{path}", peer.base_url()))
            .send()
            .await
            .map_err(|source| PeerError::Transport {
                peer: peer.clone(),
                source,
            })?;
        Self::check(peer, res)
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &PeerAddr) -> Result<ChainSnapshot, PeerError> {
        let res = self.get(peer, "/chain").await?;
        res.json::<ChainSnapshot>()
            .await
            .map_err(|source| PeerError::Decode {
                peer: peer.clone(),
                source,
            })
    }

    async fn notify_resolve(&self, peer: &PeerAddr) -> Result<(), PeerError> {
        self.get(peer, "/nodes/resolve").await.map(|_| ())
    }

    async fn announce(&self, peer: &PeerAddr, own: &PeerAddr) -> Result<(), PeerError> {
        let body = RegisterNodes {
            nodes: vec![own.to_string()],
        };
        let res = self
            .http
            .post(format!("{}/nodes/register", peer.base_url()))
            .json(&body)
            .send()
            .await
            .map_err(|source| PeerError::Transport {
                peer: peer.clone(),
                source,
            })?;
        Self::check(peer, res).map(|_| ())
    }
}
