use crate::errors::AppResult;
use clap::{Parser, Subcommand};

pub mod commands;

/// Bitcoin custody state synchroniser
#[derive(Parser)]
#[command(name = "btc-custody-sync")]
#[command(about = "Address registry, UTXO tracking and signatory-set expansion for Bitcoin custody")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List registered addresses from a ledger snapshot
    Addresses(commands::addresses::AddressesCommand),
    /// Replay ledger blocks through the signatory-set expanders
    Replay(commands::replay::ReplayCommand),
    /// Refresh UTXOs of the registered addresses against Bitcoin Core
    Utxo(commands::utxo::UtxoCommand),
    /// Test Bitcoin RPC connectivity
    TestRpc(commands::test_rpc::TestRpcCommand),
}

pub async fn run() -> AppResult<()> {
    // Uses RUST_LOG environment variable (defaults to "error" if not set)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Addresses(command) => command.run(),
        Commands::Replay(command) => command.run(),
        Commands::Utxo(command) => command.run().await,
        Commands::TestRpc(command) => command.run().await,
    }
}
