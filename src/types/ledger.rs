//! Ledger block model consumed by the custody core
//!
//! Only the commands the core reacts to are modelled; anything else the
//! ledger carries decodes as [`LedgerCommand::Other`] and is ignored.

use super::signatory::SignatoryId;
use crate::errors::{CustodyError, CustodyResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBlock {
    pub height: u64,
    #[serde(default)]
    pub transactions: Vec<LedgerTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub creator: String,
    #[serde(default)]
    pub commands: Vec<LedgerCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerCommand {
    SetAccountDetail {
        account_id: String,
        key: String,
        value: String,
    },
    #[serde(other)]
    Other,
}

impl LedgerBlock {
    /// All `SetAccountDetail` commands of the block, in ledger order
    pub fn account_details(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.transactions
            .iter()
            .flat_map(|tx| tx.commands.iter())
            .filter_map(|command| match command {
                LedgerCommand::SetAccountDetail {
                    account_id,
                    key,
                    value,
                } => Some((account_id.as_str(), key.as_str(), value.as_str())),
                LedgerCommand::Other => None,
            })
    }
}

/// Membership change payload written to the expansion trigger account.
///
/// `account_id` names the registration account whose signatories change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    pub account_id: String,
    #[serde(default)]
    pub added: Vec<SignatoryId>,
    #[serde(default)]
    pub removed: Vec<SignatoryId>,
    /// New signature threshold; the current one is kept when absent
    #[serde(default)]
    pub quorum: Option<usize>,
}

impl MembershipChange {
    pub fn from_json(key: &str, json: &str) -> CustodyResult<Self> {
        serde_json::from_str(json).map_err(|e| CustodyError::decode(key, e))
    }

    pub fn to_json(&self) -> CustodyResult<String> {
        serde_json::to_string(self).map_err(|e| CustodyError::decode("membership-change", e))
    }
}
