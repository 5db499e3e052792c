//! Dicebot agent binary

use clap::Parser;
use dicebot::constants::{HOUSE_ADDRESS, SERVER_SECRET};
use dicebot::{agent, ConfigLoader, DiceRoller, JsonRpcClient, SettlementEngine, SettlementPolicy};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "dicebot")]
#[command(about = "Provably fair dice agent for a bitcoind-style wallet node", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Port for walletnotify connections
    #[arg(long)]
    notify_port: Option<u16>,

    /// Debug logging, including the decoded payout transaction
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose { "dicebot=debug" } else { "dicebot=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("dicebot failed: {}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load_unvalidated()?;
    if let Some(secs) = args.duration_secs {
        config.agent.run_duration_secs = secs;
    }
    if let Some(port) = args.notify_port {
        config.agent.notify_port = port;
    }
    config.validate()?;

    let dice = DiceRoller::new(SERVER_SECRET)?;
    let node = Arc::new(JsonRpcClient::new(&config.node)?);
    let engine = SettlementEngine::new(node, dice, SettlementPolicy::default());

    tracing::info!("Starting dicebot");
    tracing::info!("   Node: {}", config.node.redacted());
    tracing::info!("   House address: {}", HOUSE_ADDRESS);
    tracing::info!("   Run time: {:?}", config.run_duration());

    let stats = agent::run(&config, engine).await?;
    tracing::info!("Finished: {}", stats);
    Ok(())
}
