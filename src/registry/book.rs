use super::AddressRegistry;
use crate::errors::CustodyResult;
use crate::ledger::LedgerQuery;
use crate::types::{Address, LedgerBlock};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Detail key under which a client's registered Bitcoin address is stored
pub const BTC_CURRENCY_NAME_KEY: &str = "bitcoin";

/// In-memory index of client and change addresses.
///
/// Built once from the registries, then kept current from ledger blocks so
/// the deposit path does not query the ledger per transaction.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    client_domain: String,
    clients: BTreeMap<String, String>,
    change: BTreeSet<String>,
}

impl AddressBook {
    pub fn new(client_domain: impl Into<String>) -> Self {
        Self {
            client_domain: client_domain.into(),
            clients: BTreeMap::new(),
            change: BTreeSet::new(),
        }
    }

    /// Index the client addresses of `clients` and every address of `change`
    pub fn load<C: LedgerQuery, H: LedgerQuery>(
        client_domain: impl Into<String>,
        clients: &AddressRegistry<C>,
        change: &AddressRegistry<H>,
    ) -> CustodyResult<Self> {
        let mut book = Self::new(client_domain);
        book.add_client_addresses(&clients.get_addresses()?);
        for address in change.get_addresses()? {
            book.add_change_address(&address.value);
        }
        info!(
            "Address book initialised: {} client, {} change addresses",
            book.clients.len(),
            book.change.len()
        );
        Ok(book)
    }

    pub fn add_client_address(&mut self, address: &str, account_id: &str) {
        self.clients
            .insert(address.to_string(), account_id.to_string());
        info!("Address {} has been added to the client address book", address);
    }

    /// Addresses without an owning client are skipped
    pub fn add_client_addresses(&mut self, addresses: &[Address]) {
        for address in addresses {
            match &address.info.client {
                Some(account_id) => self.add_client_address(&address.value, account_id),
                None => debug!("Address {} has no client, not indexed", address.value),
            }
        }
    }

    pub fn add_change_address(&mut self, address: &str) {
        self.change.insert(address.to_string());
        info!("Address {} has been added to the change address book", address);
    }

    pub fn is_our_client(&self, address: &str) -> bool {
        self.clients.contains_key(address)
    }

    pub fn is_change_address(&self, address: &str) -> bool {
        self.change.contains(address)
    }

    pub fn client_account_id(&self, address: &str) -> Option<&str> {
        self.clients.get(address).map(String::as_str)
    }

    /// Client and change addresses, the set the UTXO tracker polls
    pub fn tracked_addresses(&self) -> BTreeSet<String> {
        self.clients
            .keys()
            .chain(self.change.iter())
            .cloned()
            .collect()
    }

    /// Record client registrations found in `block`.
    ///
    /// A registration is a `bitcoin` detail set on an account of the client
    /// domain; its value is the address. Returns the number of new entries.
    pub fn apply_block(&mut self, block: &LedgerBlock) -> usize {
        let suffix = format!("@{}", self.client_domain);
        let registrations: Vec<(String, String)> = block
            .account_details()
            .filter(|(account_id, key, _)| {
                account_id.ends_with(&suffix) && *key == BTC_CURRENCY_NAME_KEY
            })
            .map(|(account_id, _, value)| (value.to_string(), account_id.to_string()))
            .collect();

        let mut added = 0;
        for (address, account_id) in registrations {
            match self.clients.get(&address) {
                Some(existing) if existing == &account_id => {}
                Some(existing) => warn!(
                    "Address {} already belongs to {}, ignoring registration by {}",
                    address, existing, account_id
                ),
                None => {
                    self.add_client_address(&address, &account_id);
                    added += 1;
                }
            }
        }
        added
    }
}
