//! Signatory sets for the custody multisig script

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Key limit of a bare/P2SH `OP_CHECKMULTISIG` script
pub const MAX_MULTISIG_KEYS: usize = 15;

/// Ledger account identifier of a co-signer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatoryId(String);

impl SignatoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignatoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignatoryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Ordered signatory set plus the signature threshold of the script.
///
/// Only constructed through [`SignatorySet::new`], so a value of this type
/// always satisfies `1 <= threshold <= members.len() <= MAX_MULTISIG_KEYS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSignatorySet")]
pub struct SignatorySet {
    members: BTreeSet<SignatoryId>,
    threshold: usize,
}

#[derive(Deserialize)]
struct RawSignatorySet {
    members: Vec<SignatoryId>,
    threshold: usize,
}

impl TryFrom<RawSignatorySet> for SignatorySet {
    type Error = String;

    fn try_from(raw: RawSignatorySet) -> Result<Self, Self::Error> {
        SignatorySet::new(raw.members, raw.threshold)
    }
}

impl SignatorySet {
    pub fn new(
        members: impl IntoIterator<Item = SignatoryId>,
        threshold: usize,
    ) -> Result<Self, String> {
        let members: BTreeSet<SignatoryId> = members.into_iter().collect();
        if members.is_empty() {
            return Err("signatory set would be empty".to_string());
        }
        if members.len() > MAX_MULTISIG_KEYS {
            return Err(format!(
                "signatory set of {} exceeds the {} key multisig limit",
                members.len(),
                MAX_MULTISIG_KEYS
            ));
        }
        if threshold == 0 || threshold > members.len() {
            return Err(format!(
                "threshold {} out of range for {} signatories",
                threshold,
                members.len()
            ));
        }
        Ok(Self { members, threshold })
    }

    pub fn members(&self) -> &BTreeSet<SignatoryId> {
        &self.members
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &SignatoryId) -> bool {
        self.members.contains(id)
    }

    /// `(self ∪ added) ∖ removed`, with the threshold replaced when given.
    /// Set operations make re-applying the same change a no-op.
    pub fn apply_change(
        &self,
        added: &[SignatoryId],
        removed: &[SignatoryId],
        threshold: Option<usize>,
    ) -> Result<Self, String> {
        let mut members = self.members.clone();
        members.extend(added.iter().cloned());
        for id in removed {
            members.remove(id);
        }
        Self::new(members, threshold.unwrap_or(self.threshold))
    }
}

impl fmt::Display for SignatorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.members.iter().map(SignatoryId::as_str).collect();
        write!(f, "{}-of-{} [{}]", self.threshold, self.members.len(), ids.join(", "))
    }
}

/// Immutable, versioned view of the active signatory set.
///
/// `version` counts effective changes, `last_block` is the height of the
/// last ledger block the expander processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatorySnapshot {
    pub set: SignatorySet,
    pub version: u64,
    pub last_block: Option<u64>,
}

impl SignatorySnapshot {
    pub fn genesis(set: SignatorySet) -> Self {
        Self {
            set,
            version: 0,
            last_block: None,
        }
    }

    /// True when block `height` was already processed into this snapshot
    pub fn covers(&self, height: u64) -> bool {
        self.last_block.map(|last| height <= last).unwrap_or(false)
    }
}
