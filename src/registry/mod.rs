//! Address registry over the ledger's account-detail store
//!
//! Generated addresses live on a holder account as details written by a
//! registrar account: key = address, value = JSON `AddressInfo`. The
//! registry re-reads that store on every call so callers always observe the
//! latest committed block.
//!
//! - **book** - `AddressBook`, the in-memory client/change address index a
//!   service keeps between ledger reads

pub mod book;

pub use book::AddressBook;

use crate::errors::CustodyResult;
use crate::ledger::LedgerQuery;
use crate::types::{Address, AddressInfo};
use tracing::debug;

/// Read-only view of the addresses a registrar wrote to a holder account
pub struct AddressRegistry<L> {
    ledger: L,
    holder_account: String,
    registrar_account: String,
}

impl<L: LedgerQuery> AddressRegistry<L> {
    pub fn new(
        ledger: L,
        holder_account: impl Into<String>,
        registrar_account: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            holder_account: holder_account.into(),
            registrar_account: registrar_account.into(),
        }
    }

    pub fn holder_account(&self) -> &str {
        &self.holder_account
    }

    /// All registered addresses, ordered by address.
    ///
    /// A single malformed entry fails the whole call; a partial address list
    /// is never returned.
    pub fn get_addresses(&self) -> CustodyResult<Vec<Address>> {
        let details = self
            .ledger
            .get_account_details(&self.holder_account, &self.registrar_account)?;

        let addresses = details
            .iter()
            .map(|(key, value)| Ok(Address::new(key.clone(), AddressInfo::from_json(key, value)?)))
            .collect::<CustodyResult<Vec<Address>>>()?;

        debug!(
            "Read {} addresses from {} (registrar {})",
            addresses.len(),
            self.holder_account,
            self.registrar_account
        );
        Ok(addresses)
    }

    /// Addresses generated at or before `timestamp_ms`
    pub fn get_addresses_generated_before(&self, timestamp_ms: i64) -> CustodyResult<Vec<Address>> {
        Ok(self
            .get_addresses()?
            .into_iter()
            .filter(|address| address.generated_before(timestamp_ms))
            .collect())
    }
}
