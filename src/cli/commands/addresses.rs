use super::load_config;
use crate::errors::AppResult;
use crate::ledger::{InMemoryLedger, LedgerSnapshot};
use crate::registry::AddressRegistry;
use crate::types::Address;
use crate::utils::time::millis_to_rfc3339;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// List registered addresses from a ledger snapshot
#[derive(Args)]
pub struct AddressesCommand {
    /// Ledger snapshot JSON file
    #[arg(long)]
    ledger: PathBuf,

    /// List the change-address holder instead of the client/free one
    #[arg(long)]
    change: bool,

    /// Only addresses generated at or before this time (ms since epoch)
    #[arg(long)]
    generated_before: Option<i64>,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl AddressesCommand {
    pub fn run(&self) -> AppResult<()> {
        let app_config = load_config()?;
        let ledger = InMemoryLedger::from_snapshot(LedgerSnapshot::load(&self.ledger)?);

        let holder = if self.change {
            &app_config.custody.change_holder_account
        } else {
            &app_config.custody.holder_account
        };
        let registry =
            AddressRegistry::new(ledger, holder.as_str(), app_config.custody.registrar_account.as_str());

        let addresses = match self.generated_before {
            Some(ts) => registry.get_addresses_generated_before(ts)?,
            None => registry.get_addresses()?,
        };
        info!("{} addresses on {}", addresses.len(), registry.holder_account());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&addresses)?);
        } else {
            print_table(&addresses);
        }
        Ok(())
    }
}

fn print_table(addresses: &[Address]) {
    println!("{:<40} {:<24} {:<12} {}", "ADDRESS", "CLIENT", "NODE", "GENERATED");
    for address in addresses {
        println!(
            "{:<40} {:<24} {:<12} {}",
            address.value,
            address.info.client.as_deref().unwrap_or("-"),
            address.info.node_id,
            address
                .info
                .generation_time
                .map(millis_to_rfc3339)
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}
