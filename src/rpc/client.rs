use crate::config::BitcoinRpcConfig;
use crate::errors::{CustodyResult, RpcError, RpcResult};
use crate::tracker::BitcoinNode;
use crate::types::NodeOutput;
use bitcoin::{Amount, OutPoint, Txid};
use corepc_client::client_sync::{v28::Client, Auth};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Upper bound passed to `listunspent`, Bitcoin Core's own default
const MAX_CONFIRMATIONS: u32 = 9_999_999;

/// Entry of Bitcoin Core's `listunspent` result
#[derive(Debug, Deserialize)]
struct ListUnspentEntry {
    txid: Txid,
    vout: u32,
    #[serde(with = "bitcoin::amount::serde::as_btc")]
    amount: Amount,
    confirmations: u32,
}

/// Blocking Bitcoin Core client.
///
/// Addresses must be imported into the node's (watch-only) wallet for
/// `listunspent` to report their outputs. Callers running inside tokio go
/// through [`crate::worker::CustodyWorker`], which moves these calls onto
/// `spawn_blocking` with a timeout.
#[derive(Clone)]
pub struct BitcoinRpcClient {
    client: Arc<Client>,
    url: String,
}

impl BitcoinRpcClient {
    /// Create the client without contacting the node
    pub fn new(config: &BitcoinRpcConfig) -> RpcResult<Self> {
        let auth = Auth::UserPass(config.username.clone(), config.password.clone());
        let client = Client::new_with_auth(&config.url, auth).map_err(|e| {
            RpcError::ConnectionFailed(format!("Failed to create Bitcoin RPC client: {}", e))
        })?;

        Ok(Self {
            client: Arc::new(client),
            url: config.url.clone(),
        })
    }

    /// Create the client and check the node answers
    pub fn connect(config: &BitcoinRpcConfig) -> RpcResult<Self> {
        let client = Self::new(config)?;
        let height = client.test_connection()?;
        info!(
            "Bitcoin RPC connection established to {} (height {})",
            client.url, height
        );
        Ok(client)
    }

    /// Current chain height, used as a connectivity check
    pub fn test_connection(&self) -> RpcResult<u64> {
        self.block_count().map_err(|e| {
            RpcError::ConnectionFailed(format!(
                "Failed to connect to Bitcoin RPC - check URL, credentials, and that Bitcoin Core is running: {}",
                e
            ))
        })
    }

    fn block_count(&self) -> RpcResult<u64> {
        let info = self
            .client
            .get_blockchain_info()
            .map_err(|e| RpcError::CallFailed {
                method: "getblockchaininfo".to_string(),
                message: e.to_string(),
            })?;
        u64::try_from(info.blocks)
            .map_err(|_| RpcError::InvalidResponse(format!("negative block count {}", info.blocks)))
    }

    fn list_unspent(&self, address: &str) -> RpcResult<Vec<ListUnspentEntry>> {
        let args = [json!(0), json!(MAX_CONFIRMATIONS), json!([address])];
        self.client
            .call::<Vec<ListUnspentEntry>>("listunspent", &args)
            .map_err(|e| RpcError::CallFailed {
                method: "listunspent".to_string(),
                message: e.to_string(),
            })
    }
}

/// Height of the block an output was mined in, from its depth at `tip`.
///
/// Zero confirmations means mempool. A depth beyond the tip cannot be
/// placed and is treated the same way.
fn block_height_from_depth(tip: u64, confirmations: u32) -> Option<u64> {
    match confirmations {
        0 => None,
        depth => (tip + 1).checked_sub(u64::from(depth)),
    }
}

impl BitcoinNode for BitcoinRpcClient {
    fn list_unspent_outputs(&self, address: &str) -> CustodyResult<Vec<NodeOutput>> {
        let entries = self.list_unspent(address)?;
        let tip = self.block_count()?;
        debug!("listunspent {}: {} outputs at tip {}", address, entries.len(), tip);

        Ok(entries
            .into_iter()
            .map(|entry| NodeOutput {
                outpoint: OutPoint {
                    txid: entry.txid,
                    vout: entry.vout,
                },
                amount: entry.amount,
                block_height: block_height_from_depth(tip, entry.confirmations),
            })
            .collect())
    }

    fn current_chain_height(&self) -> CustodyResult<u64> {
        Ok(self.block_count()?)
    }
}
