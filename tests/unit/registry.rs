//! Address registry and address book over an in-memory ledger

use crate::common::*;
use btc_custody_sync::errors::CustodyError;
use btc_custody_sync::ledger::InMemoryLedger;
use btc_custody_sync::registry::{AddressBook, AddressRegistry};
use std::sync::Arc;

#[test]
fn test_n_entries_give_n_addresses() -> anyhow::Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    for i in 0..25 {
        ledger.set_account_detail(HOLDER, REGISTRAR, &format!("2Nfree{:02}", i), &free_info(i));
    }
    let registry = AddressRegistry::new(Arc::clone(&ledger), HOLDER, REGISTRAR);
    let addresses = registry.get_addresses()?;
    assert_eq!(addresses.len(), 25);
    assert!(addresses.iter().all(|a| a.info.client.is_none()));
    Ok(())
}

#[test]
fn test_details_from_other_writers_are_ignored() -> anyhow::Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_account_detail(HOLDER, REGISTRAR, "2N1", &free_info(1));
    ledger.set_account_detail(HOLDER, "intruder@notary", "2Nevil", &free_info(1));

    let registry = AddressRegistry::new(ledger, HOLDER, REGISTRAR);
    let values: Vec<String> = registry.get_addresses()?.into_iter().map(|a| a.value).collect();
    assert_eq!(values, vec!["2N1".to_string()]);
    Ok(())
}

#[test]
fn test_committed_block_is_visible_on_next_read() -> anyhow::Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    let registry = AddressRegistry::new(Arc::clone(&ledger), HOLDER, REGISTRAR);
    assert!(registry.get_addresses()?.is_empty());

    let info = client_info("alice@d3", 100);
    ledger.commit_block(detail_block(1, REGISTRAR, &[(HOLDER, "2Nalice", info.as_str())]));
    let addresses = registry.get_addresses()?;
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].info.client.as_deref(), Some("alice@d3"));
    Ok(())
}

#[test]
fn test_malformed_entry_names_its_key() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_account_detail(HOLDER, REGISTRAR, "2Ngood", &free_info(1));
    ledger.set_account_detail(HOLDER, REGISTRAR, "2Nbad", "not json");

    let registry = AddressRegistry::new(ledger, HOLDER, REGISTRAR);
    match registry.get_addresses() {
        Err(CustodyError::Decode { key, .. }) => assert_eq!(key, "2Nbad"),
        other => panic!("expected a decode failure, got {:?}", other),
    }
}

#[test]
fn test_change_addresses_generated_before() -> anyhow::Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_account_detail(CHANGE_HOLDER, REGISTRAR, "2Nold", &change_info(1_000));
    ledger.set_account_detail(CHANGE_HOLDER, REGISTRAR, "2Nnew", &change_info(5_000));

    let registry = AddressRegistry::new(ledger, CHANGE_HOLDER, REGISTRAR);
    let usable = registry.get_addresses_generated_before(1_000)?;
    assert_eq!(usable.len(), 1);
    assert_eq!(usable[0].value, "2Nold");
    Ok(())
}

#[test]
fn test_address_book_loads_and_follows_blocks() -> anyhow::Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_account_detail(HOLDER, REGISTRAR, "2Nalice", &client_info("alice@d3", 1));
    ledger.set_account_detail(HOLDER, REGISTRAR, "2Nfree", &free_info(1));
    ledger.set_account_detail(CHANGE_HOLDER, REGISTRAR, "2Nchange", &change_info(1));

    let clients = AddressRegistry::new(Arc::clone(&ledger), HOLDER, REGISTRAR);
    let change = AddressRegistry::new(Arc::clone(&ledger), CHANGE_HOLDER, REGISTRAR);
    let mut book = AddressBook::load(CLIENT_DOMAIN, &clients, &change)?;

    assert!(book.is_our_client("2Nalice"));
    assert!(!book.is_our_client("2Nfree"));
    assert!(book.is_change_address("2Nchange"));
    assert_eq!(book.tracked_addresses().len(), 2);

    let added = book.apply_block(&detail_block(
        7,
        REGISTRATION_SERVICE,
        &[("bob@d3", "bitcoin", "2Nbob")],
    ));
    assert_eq!(added, 1);
    assert_eq!(book.client_account_id("2Nbob"), Some("bob@d3"));
    assert_eq!(book.tracked_addresses().len(), 3);
    Ok(())
}

#[test]
fn test_address_book_load_fails_when_ledger_is_down() {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.set_unavailable(true);
    let clients = AddressRegistry::new(Arc::clone(&ledger), HOLDER, REGISTRAR);
    let change = AddressRegistry::new(ledger, CHANGE_HOLDER, REGISTRAR);
    let err = AddressBook::load(CLIENT_DOMAIN, &clients, &change).unwrap_err();
    assert!(err.is_transient());
}
