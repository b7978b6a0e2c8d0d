//! Signatory-set expansion over block streams

use crate::common::*;
use btc_custody_sync::errors::CustodyError;
use btc_custody_sync::expansion::{
    CustodyService, ExpansionDispatcher, ExpansionOutcome, SelfMembership, SignatorySetExpander,
};
use btc_custody_sync::ledger::{InMemoryLedger, ReplayStream};
use btc_custody_sync::types::SignatoryId;

fn deposit_expander(me: &str) -> SignatorySetExpander {
    SignatorySetExpander::new(
        expansion_config(CustodyService::Deposit, HOLDER, me),
        signatory_set(&["A", "B", "C"], 2),
    )
}

#[test]
fn test_add_then_remove_scenario() -> anyhow::Result<()> {
    let expander = deposit_expander("A");
    expander.expand(&membership_block(1, HOLDER, &["D"], &[]))?;
    expander.expand(&membership_block(2, HOLDER, &[], &["B"]))?;

    let snapshot = expander.current_signatory_set();
    let members: Vec<&str> = snapshot.set.members().iter().map(SignatoryId::as_str).collect();
    assert_eq!(members, vec!["A", "C", "D"]);
    assert_eq!(snapshot.version, 2);
    assert_eq!(snapshot.last_block, Some(2));
    Ok(())
}

#[test]
fn test_replaying_stream_is_a_no_op() -> anyhow::Result<()> {
    let blocks = vec![
        membership_block(1, HOLDER, &["D"], &[]),
        membership_block(2, HOLDER, &[], &["B"]),
    ];
    let expander = deposit_expander("A");
    for block in &blocks {
        expander.expand(block)?;
    }
    let first = expander.current_signatory_set();

    for block in &blocks {
        assert_eq!(
            expander.expand(block)?,
            ExpansionOutcome::Skipped {
                height: block.height
            }
        );
    }
    assert_eq!(*expander.current_signatory_set(), *first);
    Ok(())
}

#[test]
fn test_self_membership_is_reported() -> anyhow::Result<()> {
    let expander = deposit_expander("D");
    match expander.expand(&membership_block(1, HOLDER, &["D"], &[]))? {
        ExpansionOutcome::Applied { membership, .. } => {
            assert_eq!(membership, SelfMembership::Joined)
        }
        other => panic!("expected an applied update, got {:?}", other),
    }
    match expander.expand(&membership_block(2, HOLDER, &[], &["D"]))? {
        ExpansionOutcome::Applied { membership, .. } => {
            assert_eq!(membership, SelfMembership::Left)
        }
        other => panic!("expected an applied update, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_rejected_update_keeps_previous_snapshot() {
    let expander = deposit_expander("A");
    let before = expander.current_signatory_set();

    let err = expander
        .expand(&membership_block(1, HOLDER, &[], &["A", "B"]))
        .unwrap_err();
    assert!(matches!(err, CustodyError::InvalidMembershipUpdate { block: 1, .. }));
    assert_eq!(expander.current_signatory_set(), before);
}

#[test]
fn test_malformed_payload_is_a_decode_error() {
    let expander = deposit_expander("A");
    let block = detail_block(1, "admin@notary", &[(TRIGGER, "change-1", "{\"added\": 7}")]);
    match expander.expand(&block) {
        Err(CustodyError::Decode { key, .. }) => assert_eq!(key, "change-1"),
        other => panic!("expected a decode failure, got {:?}", other),
    }
    assert_eq!(expander.current_signatory_set().version, 0);
}

#[test]
fn test_events_for_other_accounts_leave_set_unchanged() -> anyhow::Result<()> {
    let expander = deposit_expander("A");
    let outcome = expander.expand(&membership_block(1, "someone_else@notary", &["Z"], &[]))?;
    assert_eq!(outcome, ExpansionOutcome::Unchanged { height: 1 });
    assert_eq!(expander.current_signatory_set().set.len(), 3);
    Ok(())
}

#[test]
fn test_sets_beyond_one_member_are_supported() -> anyhow::Result<()> {
    let expander = deposit_expander("A");
    let added: Vec<String> = (0..12).map(|i| format!("N{}", i)).collect();
    let added_refs: Vec<&str> = added.iter().map(String::as_str).collect();
    expander.expand(&membership_block(1, HOLDER, &added_refs, &[]))?;
    assert_eq!(expander.current_signatory_set().set.len(), 15);

    // One past the multisig key limit is rejected
    assert!(expander
        .expand(&membership_block(2, HOLDER, &["overflow"], &[]))
        .is_err());
    assert_eq!(expander.current_signatory_set().set.len(), 15);
    Ok(())
}

#[tokio::test]
async fn test_subscribers_see_whole_snapshots() -> anyhow::Result<()> {
    let expander = deposit_expander("A");
    let mut rx = expander.subscribe();

    expander.expand(&membership_block(1, HOLDER, &["D"], &[]))?;
    rx.changed().await?;
    assert_eq!(rx.borrow().set.len(), 4);

    // A block with no effective change does not notify
    expander.expand(&membership_block(2, HOLDER, &["D"], &[]))?;
    assert!(!rx.has_changed()?);
    Ok(())
}

#[test]
fn test_dispatcher_runs_ledger_replay() -> anyhow::Result<()> {
    let ledger = InMemoryLedger::new();
    ledger.commit_block(membership_block(2, HOLDER, &[], &["B"]));
    ledger.commit_block(membership_block(1, HOLDER, &["D"], &[]));

    let dispatcher = ExpansionDispatcher::new(
        CustodyService::ALL
            .iter()
            .map(|service| {
                SignatorySetExpander::new(
                    expansion_config(*service, HOLDER, "A"),
                    signatory_set(&["A", "B", "C"], 2),
                )
            })
            .collect(),
    );
    let summary = dispatcher.run(&mut ledger.replay())?;
    assert_eq!(summary.last_height, Some(2));
    for snapshot in dispatcher.snapshots().values() {
        assert_eq!(snapshot.set, signatory_set(&["A", "C", "D"], 2));
    }

    let again = dispatcher.run(&mut ReplayStream::new(ledger.blocks()))?;
    assert_eq!(again.applied, 0);
    Ok(())
}
