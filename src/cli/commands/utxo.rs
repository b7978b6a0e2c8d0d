use super::{load_config, RpcArgs};
use crate::aggregate::{available_sum, utxo_view};
use crate::errors::AppResult;
use crate::ledger::{InMemoryLedger, LedgerSnapshot};
use crate::registry::{AddressBook, AddressRegistry};
use crate::rpc::{execute_with_timeout, BitcoinRpcClient};
use crate::tracker::UtxoTracker;
use crate::utils::currency::format_sats_as_btc;
use bitcoin::Amount;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Refresh UTXOs of the registered addresses against Bitcoin Core
#[derive(Args)]
pub struct UtxoCommand {
    /// Ledger snapshot JSON file
    #[arg(long)]
    ledger: PathBuf,

    /// Minimum confirmations for the view and sum (defaults to the confidence level)
    #[arg(long)]
    confirmations: Option<u32>,

    #[command(flatten)]
    rpc: RpcArgs,
}

impl UtxoCommand {
    pub async fn run(&self) -> AppResult<()> {
        let app_config = load_config()?;
        let mut rpc_config = app_config.bitcoin_rpc.clone();
        self.rpc.apply(&mut rpc_config);

        let custody = app_config.custody.clone();
        let ledger = Arc::new(InMemoryLedger::from_snapshot(LedgerSnapshot::load(
            &self.ledger,
        )?));
        let clients = AddressRegistry::new(
            Arc::clone(&ledger),
            custody.holder_account.as_str(),
            custody.registrar_account.as_str(),
        );
        let change = AddressRegistry::new(
            ledger,
            custody.change_holder_account.as_str(),
            custody.registrar_account.as_str(),
        );
        let book = AddressBook::load(custody.client_domain.as_str(), &clients, &change)?;
        let tracked = book.tracked_addresses();
        info!("Refreshing {} tracked addresses", tracked.len());

        let confidence_level = custody.confidence_level;
        let report = execute_with_timeout(rpc_config.timeout_seconds, "utxo refresh", move || {
            let tracker = UtxoTracker::new(BitcoinRpcClient::new(&rpc_config)?, confidence_level);
            tracker.refresh(tracked)
        })
        .await?;

        for utxo in report.reverted.iter().chain(report.demoted.iter()) {
            warn!("Output {} is no longer confirmed", utxo.outpoint);
        }

        let min_confirmations = self.confirmations.unwrap_or(confidence_level);
        let view = utxo_view(&report.utxos, min_confirmations);
        let sum = available_sum(&report.utxos, min_confirmations);
        info!(
            "{} outputs with >= {} confirmations, {}",
            view.utxo_list.len(),
            min_confirmations,
            format_sats_as_btc(Amount::from_sat(sum.sats))
        );

        let output = json!({
            "chain_height": report.chain_height,
            "min_confirmations": min_confirmations,
            "available": sum,
            "utxos": view,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
