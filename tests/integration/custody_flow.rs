//! Client registration on the ledger through to the spendable balance

use crate::common::*;
use btc_custody_sync::aggregate::{available_sum, current_sum};
use btc_custody_sync::ledger::InMemoryLedger;
use btc_custody_sync::registry::{AddressBook, AddressRegistry};
use btc_custody_sync::rpc::retry::Backoff;
use btc_custody_sync::tracker::UtxoTracker;
use btc_custody_sync::worker::{CustodyWorker, WorkerSettings};
use bitcoin::Amount;
use std::sync::Arc;
use std::time::Duration;

/// Ledger with one registered client address, one free address and one
/// change address
fn seeded_ledger() -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new());
    let alice = client_info("alice@d3", 1_000);
    let free = free_info(1_000);
    let change = change_info(1_000);
    ledger.commit_block(detail_block(
        1,
        REGISTRAR,
        &[
            (HOLDER, "2Nalice", alice.as_str()),
            (HOLDER, "2Nfree", free.as_str()),
            (CHANGE_HOLDER, "2Nchange", change.as_str()),
        ],
    ));
    ledger
}

#[test]
fn test_registration_to_spendable_sum() -> anyhow::Result<()> {
    let ledger = seeded_ledger();
    let clients = AddressRegistry::new(Arc::clone(&ledger), HOLDER, REGISTRAR);
    let change = AddressRegistry::new(Arc::clone(&ledger), CHANGE_HOLDER, REGISTRAR);
    let mut book = AddressBook::load(CLIENT_DOMAIN, &clients, &change)?;

    let node = Arc::new(MockNode::at_height(100));
    node.set_outputs("2Nalice", vec![node_output(1, 0, 40_000, Some(95))]);
    node.set_outputs("2Nchange", vec![node_output(2, 1, 60_000, Some(90))]);
    node.set_outputs("2Nfree", vec![node_output(3, 0, 999_999, Some(50))]);
    node.set_outputs("2Nbob", vec![node_output(4, 0, 5_000, Some(99))]);
    let tracker = UtxoTracker::new(Arc::clone(&node), 6);

    let report = tracker.refresh(book.tracked_addresses())?;
    // Free addresses belong to nobody yet and are not tracked
    assert_eq!(report.utxos.len(), 2);
    assert_eq!(current_sum(&report.utxos), Amount::from_sat(100_000));

    // Bob registers; his pending deposit shows up but is not spendable
    book.apply_block(&detail_block(2, REGISTRATION_SERVICE, &[("bob@d3", "bitcoin", "2Nbob")]));
    let report = tracker.refresh(book.tracked_addresses())?;
    assert_eq!(report.utxos.len(), 3);
    assert_eq!(report.pending().count(), 1);
    assert_eq!(current_sum(&report.utxos), Amount::from_sat(100_000));
    assert_eq!(available_sum(&report.utxos, 1).sum_btc, "0.00105000");

    // Four more blocks and the deposit reaches the confidence level
    node.set_height(104);
    let report = tracker.refresh(book.tracked_addresses())?;
    assert_eq!(report.newly_confirmed.len(), 1);
    assert_eq!(current_sum(&report.utxos), Amount::from_sat(105_000));
    Ok(())
}

#[test]
fn test_reorg_reduces_spendable_sum_and_is_reported() -> anyhow::Result<()> {
    let ledger = seeded_ledger();
    let clients = AddressRegistry::new(Arc::clone(&ledger), HOLDER, REGISTRAR);
    let change = AddressRegistry::new(Arc::clone(&ledger), CHANGE_HOLDER, REGISTRAR);
    let book = AddressBook::load(CLIENT_DOMAIN, &clients, &change)?;

    let node = Arc::new(MockNode::at_height(100));
    node.set_outputs("2Nalice", vec![node_output(1, 0, 40_000, Some(94))]);
    let tracker = UtxoTracker::new(Arc::clone(&node), 6);
    assert_eq!(
        current_sum(&tracker.refresh(book.tracked_addresses())?.utxos),
        Amount::from_sat(40_000)
    );

    node.set_outputs("2Nalice", vec![]);
    let report = tracker.refresh(book.tracked_addresses())?;
    assert!(report.has_reversals());
    assert_eq!(report.reverted[0].receiver_address, "2Nalice");
    assert_eq!(current_sum(&report.utxos), Amount::ZERO);
    Ok(())
}

#[tokio::test]
async fn test_worker_tracks_ledger_updates() -> anyhow::Result<()> {
    let ledger = seeded_ledger();
    let node = Arc::new(MockNode::at_height(100));
    node.set_outputs("2Nalice", vec![node_output(1, 0, 40_000, Some(90))]);
    node.set_outputs("2Ncarol", vec![node_output(5, 0, 7_000, Some(90))]);

    let handle = CustodyWorker::new(
        AddressRegistry::new(Arc::clone(&ledger), HOLDER, REGISTRAR),
        AddressRegistry::new(Arc::clone(&ledger), CHANGE_HOLDER, REGISTRAR),
        UtxoTracker::new(Arc::clone(&node), 6),
        WorkerSettings {
            client_domain: CLIENT_DOMAIN.to_string(),
            poll_interval: Duration::from_secs(3600),
            timeout_seconds: 5,
            backoff: Backoff::new(Duration::from_millis(10), 2.0, 1),
        },
    )
    .spawn();

    let first = handle.refresh_now().await?;
    assert_eq!(current_sum(&first.utxos), Amount::from_sat(40_000));

    // A new client address committed to the ledger is picked up on the next refresh
    let carol = client_info("carol@d3", 2_000);
    ledger.commit_block(detail_block(2, REGISTRAR, &[(HOLDER, "2Ncarol", carol.as_str())]));
    let second = handle.refresh_now().await?;
    assert_eq!(current_sum(&second.utxos), Amount::from_sat(47_000));

    let latest = handle.latest_report().await?.expect("report after refresh");
    assert_eq!(latest.utxos.len(), 2);
    assert_eq!(handle.error_count(), 0);
    handle.shutdown().await?;
    Ok(())
}
