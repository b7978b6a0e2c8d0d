//! Ledger snapshot file replay across all services, with checkpoint resume

use crate::common::*;
use btc_custody_sync::database::CheckpointStore;
use btc_custody_sync::expansion::{CustodyService, ExpansionDispatcher, SignatorySetExpander};
use btc_custody_sync::ledger::{InMemoryLedger, LedgerSnapshot, ReplayStream};
use btc_custody_sync::registry::AddressRegistry;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn dispatcher_from_genesis() -> ExpansionDispatcher {
    ExpansionDispatcher::new(
        CustodyService::ALL
            .iter()
            .map(|service| {
                SignatorySetExpander::new(
                    expansion_config(*service, HOLDER, "A"),
                    signatory_set(&["A", "B", "C"], 2),
                )
            })
            .collect(),
    )
}

fn write_snapshot(dir: &TempDir) -> anyhow::Result<std::path::PathBuf> {
    let snapshot = json!({
        "account_details": {
            HOLDER: { REGISTRAR: { "2Nalice": client_info("alice@d3", 10) } }
        },
        "blocks": [
            {
                "height": 1,
                "transactions": [{
                    "creator": "admin@notary",
                    "commands": [
                        { "type": "transfer_asset", "amount": "1" },
                        {
                            "type": "set_account_detail",
                            "account_id": TRIGGER,
                            "key": "change-1",
                            "value": membership_event(HOLDER, &["D"], &[])
                        }
                    ]
                }]
            },
            {
                "height": 2,
                "transactions": [{
                    "creator": "admin@notary",
                    "commands": [{
                        "type": "set_account_detail",
                        "account_id": TRIGGER,
                        "key": "change-2",
                        "value": membership_event(HOLDER, &[], &["B"])
                    }]
                }]
            }
        ]
    });
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;
    Ok(path)
}

#[test]
fn test_snapshot_file_replay_and_resume() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let ledger = Arc::new(InMemoryLedger::from_snapshot(LedgerSnapshot::load(
        &write_snapshot(&dir)?,
    )?));

    // Account details in the snapshot serve registry reads
    let addresses = AddressRegistry::new(Arc::clone(&ledger), HOLDER, REGISTRAR).get_addresses()?;
    assert_eq!(addresses.len(), 1);

    let dispatcher = dispatcher_from_genesis();
    let summary = dispatcher.run(&mut ledger.replay())?;
    assert_eq!(summary.blocks, 2);
    assert_eq!(summary.applied, 6);
    assert_eq!(summary.rejected, 0);

    let db_path = dir.path().join("checkpoints.db");
    let mut store = CheckpointStore::new(&db_path)?;
    store.save_all(&dispatcher.snapshots())?;
    drop(store);

    // Restart: resume every service from its checkpoint and continue
    let store = CheckpointStore::new(&db_path)?;
    let mut expanders = Vec::new();
    for service in CustodyService::ALL {
        let snapshot = store.load(service)?.expect("checkpoint per service");
        assert_eq!(snapshot.last_block, Some(2));
        expanders.push(SignatorySetExpander::from_snapshot(
            expansion_config(service, HOLDER, "A"),
            snapshot,
        ));
    }
    let resumed = ExpansionDispatcher::new(expanders);

    let mut stream = ReplayStream::new(
        ledger
            .blocks()
            .into_iter()
            .chain(std::iter::once(membership_block(3, HOLDER, &["E"], &[])))
            .collect(),
    );
    let summary = resumed.run(&mut stream)?;
    assert_eq!(summary.blocks, 3);
    assert_eq!(summary.applied, 3);

    for snapshot in resumed.snapshots().values() {
        assert_eq!(snapshot.set, signatory_set(&["A", "C", "D", "E"], 2));
        assert_eq!(snapshot.version, 3);
    }
    Ok(())
}

#[test]
fn test_rejected_block_is_counted_and_others_continue() -> anyhow::Result<()> {
    let dispatcher = dispatcher_from_genesis();
    let blocks = vec![
        membership_block(1, HOLDER, &[], &["A", "B", "C"]),
        membership_block(2, HOLDER, &["D"], &[]),
    ];
    let summary = dispatcher.run(&mut ReplayStream::new(blocks))?;
    assert_eq!(summary.rejected, 3);
    assert_eq!(summary.applied, 3);
    for snapshot in dispatcher.snapshots().values() {
        assert_eq!(snapshot.set.len(), 4);
    }
    Ok(())
}

#[test]
fn test_replayed_blocks_are_not_rejected_again() -> anyhow::Result<()> {
    let dispatcher = dispatcher_from_genesis();
    let blocks = vec![
        membership_block(1, HOLDER, &["D"], &["B"]),
        detail_block(2, "admin@notary", &[]),
    ];
    dispatcher.run(&mut ReplayStream::new(blocks))?;

    // Heights already covered are skipped even when their payload is unreadable
    let replay = vec![detail_block(2, "admin@notary", &[(TRIGGER, "change-2", "{not json")])];
    let summary = dispatcher.run(&mut ReplayStream::new(replay))?;
    assert_eq!(summary.rejected, 0);
    for snapshot in dispatcher.snapshots().values() {
        assert_eq!(snapshot.set, signatory_set(&["A", "C", "D"], 2));
        assert_eq!(snapshot.last_block, Some(2));
    }
    Ok(())
}
