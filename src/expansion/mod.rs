//! Signatory set expansion driven by ledger blocks
//!
//! Membership changes are committed to the ledger as account details on an
//! expansion trigger account; each detail value is a JSON
//! [`MembershipChange`] naming the registration account it applies to.
//! Every custody service (address generation, deposit, withdrawal) runs the
//! same [`SignatorySetExpander`], parameterised only by its own credential,
//! so the three services derive identical signatory sets from the same
//! block history.
//!
//! - **dispatcher** - fans each block out to the per-service expanders

pub mod dispatcher;

pub use dispatcher::{DispatchSummary, ExpansionDispatcher};

use crate::errors::{CustodyError, CustodyResult};
use crate::types::{LedgerBlock, MembershipChange, SignatoryId, SignatorySet, SignatorySnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Custody services that keep their own copy of the signatory set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustodyService {
    AddressGeneration,
    Deposit,
    Withdrawal,
}

impl CustodyService {
    pub const ALL: [CustodyService; 3] = [
        CustodyService::AddressGeneration,
        CustodyService::Deposit,
        CustodyService::Withdrawal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustodyService::AddressGeneration => "address_generation",
            CustodyService::Deposit => "deposit",
            CustodyService::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for CustodyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Designated credential of a service: the registration account it expands
/// and its own signatory identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCredential {
    pub account_id: String,
    pub signatory: SignatoryId,
}

#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    pub service: CustodyService,
    pub credential: ServiceCredential,
    /// Account whose details carry membership change payloads
    pub trigger_account: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpanderState {
    Idle,
    Applying,
}

/// Where this service's own signatory stands after a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfMembership {
    Joined,
    Left,
    Member,
    NotMember,
}

impl SelfMembership {
    fn between(before: &SignatorySet, after: &SignatorySet, me: &SignatoryId) -> Self {
        match (before.contains(me), after.contains(me)) {
            (false, true) => SelfMembership::Joined,
            (true, false) => SelfMembership::Left,
            (true, true) => SelfMembership::Member,
            (false, false) => SelfMembership::NotMember,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionOutcome {
    /// Block at or below the last processed height; nothing re-applied
    Skipped { height: u64 },
    /// Block processed, active set unchanged
    Unchanged { height: u64 },
    /// New active set published
    Applied {
        height: u64,
        snapshot: Arc<SignatorySnapshot>,
        membership: SelfMembership,
    },
}

impl ExpansionOutcome {
    pub fn height(&self) -> u64 {
        match self {
            ExpansionOutcome::Skipped { height }
            | ExpansionOutcome::Unchanged { height }
            | ExpansionOutcome::Applied { height, .. } => *height,
        }
    }
}

pub struct SignatorySetExpander {
    config: ExpansionConfig,
    state: watch::Sender<Arc<SignatorySnapshot>>,
    applying: AtomicBool,
}

impl SignatorySetExpander {
    /// Start from genesis with `initial` as the active set
    pub fn new(config: ExpansionConfig, initial: SignatorySet) -> Self {
        Self::from_snapshot(config, SignatorySnapshot::genesis(initial))
    }

    /// Resume from a checkpointed snapshot
    pub fn from_snapshot(config: ExpansionConfig, snapshot: SignatorySnapshot) -> Self {
        let (state, _) = watch::channel(Arc::new(snapshot));
        Self {
            config,
            state,
            applying: AtomicBool::new(false),
        }
    }

    pub fn service(&self) -> CustodyService {
        self.config.service
    }

    pub fn credential(&self) -> &ServiceCredential {
        &self.config.credential
    }

    pub fn state(&self) -> ExpanderState {
        if self.applying.load(Ordering::SeqCst) {
            ExpanderState::Applying
        } else {
            ExpanderState::Idle
        }
    }

    /// The active signatory set; always a whole, published snapshot
    pub fn current_signatory_set(&self) -> Arc<SignatorySnapshot> {
        Arc::clone(&self.state.borrow())
    }

    /// Receiver notified on every effective change of the active set
    pub fn subscribe(&self) -> watch::Receiver<Arc<SignatorySnapshot>> {
        self.state.subscribe()
    }

    /// Membership changes in `block` addressed to this service's account
    pub fn membership_changes(&self, block: &LedgerBlock) -> CustodyResult<Vec<MembershipChange>> {
        let mut changes = Vec::new();
        for (account_id, key, value) in block.account_details() {
            if account_id != self.config.trigger_account {
                continue;
            }
            let change = MembershipChange::from_json(key, value)?;
            if change.account_id == self.config.credential.account_id {
                changes.push(change);
            }
        }
        Ok(changes)
    }

    /// Process one block.
    ///
    /// Blocks already covered by the active snapshot are skipped. On a decode
    /// failure or an invalid resulting set, the active snapshot is left
    /// exactly as it was.
    pub fn expand(&self, block: &LedgerBlock) -> CustodyResult<ExpansionOutcome> {
        let height = block.height;
        if self.state.borrow().covers(height) {
            debug!("[{}] block {} already processed", self.config.service, height);
            return Ok(ExpansionOutcome::Skipped { height });
        }
        let changes = self.membership_changes(block)?;
        let me = &self.config.credential.signatory;

        let mut result: CustodyResult<ExpansionOutcome> = Ok(ExpansionOutcome::Skipped { height });
        self.state.send_if_modified(|current| {
            if current.covers(height) {
                debug!(
                    "[{}] block {} already processed (last {:?})",
                    self.config.service, height, current.last_block
                );
                return false;
            }

            self.applying.store(true, Ordering::SeqCst);
            let mut set = current.set.clone();
            for change in &changes {
                match set.apply_change(&change.added, &change.removed, change.quorum) {
                    Ok(next) => set = next,
                    Err(reason) => {
                        self.applying.store(false, Ordering::SeqCst);
                        result = Err(CustodyError::InvalidMembershipUpdate {
                            block: height,
                            reason,
                        });
                        return false;
                    }
                }
            }

            let changed = set != current.set;
            let membership = SelfMembership::between(&current.set, &set, me);
            let next = Arc::new(SignatorySnapshot {
                version: if changed { current.version + 1 } else { current.version },
                set,
                last_block: Some(height),
            });
            result = Ok(if changed {
                ExpansionOutcome::Applied {
                    height,
                    snapshot: Arc::clone(&next),
                    membership,
                }
            } else {
                ExpansionOutcome::Unchanged { height }
            });
            *current = next;
            self.applying.store(false, Ordering::SeqCst);
            changed
        });

        match &result {
            Ok(ExpansionOutcome::Applied {
                snapshot,
                membership,
                ..
            }) => info!(
                "[{}] signatory set updated at block {}: {} (v{}, self {:?})",
                self.config.service, height, snapshot.set, snapshot.version, membership
            ),
            Err(e) => warn!("[{}] membership update rejected: {}", self.config.service, e),
            _ => {}
        }
        result
    }
}
