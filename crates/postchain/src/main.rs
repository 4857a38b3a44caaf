use std::sync::Arc;

use clap::{Parser, Subcommand};
use postchain::http::NodeApi;
use postchain::config::parse_difficulty;
use postchain::{Config, DEFAULT_DIFFICULTY, Node, genesis_block};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "postchain", about = "Proof-of-work post ledger node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a node
    Run(Config),
    /// Print the genesis block every node at this difficulty starts from
    Genesis {
        #[arg(
            short,
            long,
            env = "POSTCHAIN_DIFFICULTY",
            default_value_t = DEFAULT_DIFFICULTY,
            value_parser = parse_difficulty
        )]
        difficulty: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Genesis { difficulty } => {
            let genesis = genesis_block(difficulty)?;
            println!("{}", serde_json::to_string_pretty(&genesis)?);
        }
        Command::Run(config) => {
            let listener = TcpListener::bind(config.listen).await?;
            let bound = listener.local_addr()?;
            let settings = config.settings(bound);

            let node = Arc::new(Node::new(settings)?);
            tracing::info!(%bound, public_url = node.public_url(), "node listening");

            if let Some(interval) = config.consensus_interval() {
                node.spawn_consensus_task(interval);
            }

            let api = NodeApi::new(Arc::clone(&node));
            let server = tokio::spawn(api.run(listener));

            if let Some(remote) = config.bootstrap.as_deref() {
                match node.register_with(remote).await {
                    Ok(length) => tracing::info!(remote, length, "synced with bootstrap node"),
                    Err(e) => tracing::warn!(remote, "bootstrap registration failed: {e}"),
                }
            }

            server.await??;
        }
    }

    Ok(())
}
