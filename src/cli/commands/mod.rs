pub mod addresses;
pub mod replay;
pub mod test_rpc;
pub mod utxo;

use crate::config::{AppConfig, BitcoinRpcConfig};
use crate::errors::{AppError, AppResult};
use clap::Args;
use tracing::{info, warn};

/// Bitcoin RPC overrides shared by the node-facing commands
#[derive(Args, Debug, Default)]
pub struct RpcArgs {
    /// Bitcoin RPC URL
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Bitcoin RPC username
    #[arg(long)]
    pub rpc_username: Option<String>,

    /// Bitcoin RPC password
    #[arg(long)]
    pub rpc_password: Option<String>,
}

impl RpcArgs {
    pub fn apply(&self, rpc_config: &mut BitcoinRpcConfig) {
        if let Some(url) = &self.rpc_url {
            rpc_config.url = url.clone();
        }
        if let Some(username) = &self.rpc_username {
            rpc_config.username = username.clone();
        }
        if let Some(password) = &self.rpc_password {
            rpc_config.password = password.clone();
        }
    }
}

/// Load configuration, with a hint on failure
pub fn load_config() -> AppResult<AppConfig> {
    match AppConfig::load() {
        Ok(config) => {
            info!("Configuration loaded successfully");
            Ok(config)
        }
        Err(e) => {
            warn!("Failed to load configuration: {}", e);
            Err(AppError::Config(format!(
                "{}. Check config.toml and the BITCOIN_RPC_* / CUSTODY_* environment variables",
                e
            )))
        }
    }
}
