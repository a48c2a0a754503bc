use anyhow::Context;
use clap::Parser;
use ledger_node::{serve, AppState, Args, Engine, HttpPeerClient};
use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let node_id = args.node_id();
    let peers = HttpPeerClient::new(args.peer_timeout()).context("building peer client")?;
    let engine = Engine::new(node_id.clone(), Arc::new(peers), args.engine_config());

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;

    for peer in &args.peers {
        engine.register_node(peer.clone()).await;
    }

    info!(
        %node_id,
        length_policy = %args.length_policy,
        "ledger-node listening on http://{}",
        listener.local_addr()?
    );
    serve(listener, AppState::new(engine), async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    })
    .await?;
    Ok(())
}
