use anyhow::Result;
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine one block
    Mine,
    /// Mine until `mine-stop` is called; prints the number of blocks mined
    MineAlways,
    /// Stop continuous mining
    MineStop,
    /// List pending transactions
    Transactions,
    /// Submit a transaction
    Submit {
        /// Opaque payload
        #[arg(long)]
        data: String,
    },
    /// Show the full chain
    Chain,
    /// Register peers with the node
    Register {
        /// Peer address (host:port); may be repeated
        #[arg(long = "peer", required = true)]
        peers: Vec<String>,
    },
    /// Run conflict resolution on the node
    Resolve,
    /// List the node's peers
    Nodes,
}

#[derive(Serialize)]
struct Tx {
    data: String,
}

#[derive(Serialize)]
struct Register {
    nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = Client::new();
    let req = match cli.cmd {
        Command::Mine => client.get(format!("{node}/mine")),
        Command::MineAlways => client.get(format!("{node}/mine/always")),
        Command::MineStop => client.get(format!("{node}/mine/stop")),
        Command::Transactions => client.get(format!("{node}/transactions")),
        Command::Submit { data } => client
            .post(format!("{node}/transactions/new"))
            .json(&Tx { data }),
        Command::Chain => client.get(format!("{node}/chain")),
        Command::Register { peers } => client
            .post(format!("{node}/nodes/register"))
            .json(&Register { nodes: peers }),
        Command::Resolve => client.get(format!("{node}/nodes/resolve")),
        Command::Nodes => client.get(format!("{node}/nodes")),
    };
    debug!(?req, "sending request");

    let res = req.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
