//! Bitcoin Core client construction and the worker's timeout helpers

use crate::common::*;
use btc_custody_sync::config::BitcoinRpcConfig;
use btc_custody_sync::rpc::{execute_with_timeout, BitcoinRpcClient};
use btc_custody_sync::tracker::BitcoinNode;
use std::sync::Arc;

/// Nothing listens on port 1
fn unreachable_config() -> BitcoinRpcConfig {
    BitcoinRpcConfig {
        url: "http://127.0.0.1:1".to_string(),
        timeout_seconds: 5,
        ..BitcoinRpcConfig::default()
    }
}

#[test]
fn test_unreachable_node_is_a_transport_failure() -> anyhow::Result<()> {
    let client = BitcoinRpcClient::new(&unreachable_config())?;
    let err = client.current_chain_height().unwrap_err();
    assert!(err.is_transient());
    assert!(client.list_unspent_outputs("2Nx").unwrap_err().is_transient());
    Ok(())
}

#[test]
fn test_connect_fails_fast_without_node() {
    assert!(BitcoinRpcClient::connect(&unreachable_config()).is_err());
}

#[tokio::test]
async fn test_blocking_node_call_under_timeout() -> anyhow::Result<()> {
    let node = Arc::new(MockNode::at_height(840_000));
    let height = execute_with_timeout(5, "getblockchaininfo", {
        let node = Arc::clone(&node);
        move || node.current_chain_height()
    })
    .await?;
    assert_eq!(height, 840_000);

    node.set_offline(true);
    let err = execute_with_timeout(5, "getblockchaininfo", move || node.current_chain_height())
        .await
        .unwrap_err();
    assert!(err.is_transient());
    Ok(())
}
