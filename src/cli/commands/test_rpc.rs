use super::RpcArgs;
use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::rpc::{execute_with_timeout, BitcoinRpcClient};
use clap::Args;
use tracing::{error, info};

/// Test Bitcoin RPC connectivity
#[derive(Args)]
pub struct TestRpcCommand {
    #[command(flatten)]
    pub rpc: RpcArgs,
}

impl TestRpcCommand {
    pub async fn run(&self) -> AppResult<()> {
        info!("=== Testing Bitcoin RPC Connection ===");

        let app_config = AppConfig::get_defaults().map_err(|e| AppError::Config(e.to_string()))?;
        let mut rpc_config = app_config.bitcoin_rpc;
        self.rpc.apply(&mut rpc_config);

        info!("Testing connection to: {}", rpc_config.url);
        info!("Username: {}", rpc_config.username);

        let timeout_seconds = rpc_config.timeout_seconds;
        let result = execute_with_timeout(timeout_seconds, "getblockchaininfo", move || {
            let client = BitcoinRpcClient::new(&rpc_config)?;
            Ok(client.test_connection()?)
        })
        .await;

        match result {
            Ok(height) => {
                println!("Bitcoin RPC connection test PASSED");
                println!("Chain height: {}", height);
                Ok(())
            }
            Err(e) => {
                error!("RPC connection test failed: {}", e);
                println!("Bitcoin RPC connection test FAILED");
                println!("Error: {}", e);
                println!("\nTroubleshooting tips:");
                println!("1. Check that Bitcoin Core is running");
                println!("2. Verify the RPC URL is correct");
                println!("3. Ensure RPC credentials are valid");
                println!("4. Check that RPC server is enabled in bitcoin.conf");

                Err(AppError::Config(format!("RPC test failed: {}", e)))
            }
        }
    }
}
