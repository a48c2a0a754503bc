//! HTTP front door: maps requests onto [`Engine`] operations.
use crate::{
    constants::{MSG_CHAIN_AUTHORITATIVE, MSG_CHAIN_REPLACED, MSG_NODES_ADDED},
    engine::{Engine, EngineError, StopSignal},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{consensus::ChainSnapshot, Block, LedgerError, PeerAddr, Transaction};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
    mining: Arc<Mutex<Option<StopSignal>>>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            mining: Arc::new(Mutex::new(None)),
        }
    }

    /// Raises the stop signal of the running continuous mining session.
    /// Returns false when no session was running.
    pub async fn stop_mining(&self) -> bool {
        match self.mining.lock().await.take() {
            Some(signal) if !signal.is_stopped() => {
                signal.stop();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterNodes {
    pub nodes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub total_nodes: Vec<PeerAddr>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    pub chain: Vec<Block>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodesResponse {
    pub nodes: Vec<PeerAddr>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MinedResponse {
    pub message: String,
    pub blocks_mined: u64,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    BadRequest(#[from] LedgerError),

    #[error("continuous mining is already running")]
    MiningAlreadyRunning,

    #[error("mining task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MiningAlreadyRunning => StatusCode::CONFLICT,
            ApiError::Engine(EngineError::Mine(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Engine(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/mine", get(mine))
        .route("/mine/always", get(mine_always))
        .route("/mine/stop", get(mine_stop))
        .route("/transactions", get(transactions))
        .route("/transactions/new", post(new_transaction))
        .route("/chain", get(chain))
        .route("/nodes", get(nodes))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the node on `listener` until `shutdown` resolves.
///
/// Graceful shutdown waits for open requests, so a running `/mine/always`
/// session is told to stop first; its request then finishes after the
/// current block.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            if state.stop_mining().await {
                info!("stopping continuous mining");
            }
        })
        .await
}

// Mining runs in its own task so a dropped request cannot lose the drawn transactions.
async fn mine(State(state): State<AppState>) -> Result<Json<Block>, ApiError> {
    let engine = Arc::clone(&state.engine);
    let block = tokio::spawn(async move { engine.mine().await }).await??;
    Ok(Json(block))
}

async fn mine_always(State(state): State<AppState>) -> Result<Json<MinedResponse>, ApiError> {
    let signal = {
        let mut active = state.mining.lock().await;
        if active.as_ref().is_some_and(|s| !s.is_stopped()) {
            return Err(ApiError::MiningAlreadyRunning);
        }
        let signal = StopSignal::default();
        *active = Some(signal.clone());
        signal
    };
    info!("continuous mining started");

    let engine = Arc::clone(&state.engine);
    let session = signal.clone();
    let result = tokio::spawn(async move {
        let result = engine.mine_continuously(session.clone()).await;
        session.stop();
        result
    })
    .await;
    signal.stop();

    let blocks_mined = result??;
    Ok(Json(MinedResponse {
        message: format!("mined {blocks_mined} blocks"),
        blocks_mined,
    }))
}

async fn mine_stop(State(state): State<AppState>) -> Json<MessageResponse> {
    let message = if state.stop_mining().await {
        "continuous mining will stop after the current block"
    } else {
        "continuous mining is not running"
    };
    Json(MessageResponse {
        message: message.to_string(),
    })
}

async fn transactions(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.engine.pending().await)
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(tx): Json<Transaction>,
) -> Json<MessageResponse> {
    let index = state.engine.new_transaction(tx).await;
    Json(MessageResponse {
        message: format!("Transaction will be in block {index}"),
    })
}

async fn chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    Json(state.engine.chain().await)
}

async fn nodes(State(state): State<AppState>) -> Json<NodesResponse> {
    Json(NodesResponse {
        nodes: state.engine.nodes().await,
    })
}

async fn register_nodes(
    State(state): State<AppState>,
    Json(req): Json<RegisterNodes>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let addrs = req
        .nodes
        .iter()
        .map(|node| node.parse::<PeerAddr>())
        .collect::<Result<Vec<_>, _>>()?;
    for addr in addrs {
        state.engine.register_node(addr).await;
    }
    Ok(Json(RegisterResponse {
        message: MSG_NODES_ADDED.to_string(),
        total_nodes: state.engine.nodes().await,
    }))
}

async fn resolve(State(state): State<AppState>) -> Json<ResolveResponse> {
    let replaced = state.engine.resolve_conflicts().await;
    let message = if replaced {
        MSG_CHAIN_REPLACED
    } else {
        MSG_CHAIN_AUTHORITATIVE
    };
    Json(ResolveResponse {
        message: message.to_string(),
        chain: state.engine.chain().await.chain,
    })
}
