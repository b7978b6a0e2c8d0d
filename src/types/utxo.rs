//! Unspent outputs held by custody addresses

use bitcoin::{Amount, OutPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output as reported by the Bitcoin node for a single address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOutput {
    pub outpoint: OutPoint,
    pub amount: Amount,
    /// Height of the containing block, `None` while in the mempool
    pub block_height: Option<u64>,
}

/// Confirmation class of a tracked output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoStatus {
    /// Below the confidence level, including mempool outputs
    Pending,
    /// At or above the confidence level; spendable
    Confirmed,
    /// Previously reported, no longer seen by the node
    Unknown,
}

impl fmt::Display for UtxoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UtxoStatus::Pending => write!(f, "pending"),
            UtxoStatus::Confirmed => write!(f, "confirmed"),
            UtxoStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Depth of an output: `chain_height - block_height + 1`.
///
/// Mempool outputs and outputs claiming a block above the observed tip
/// (the tip moved between node calls) count as zero.
pub fn confirmations(chain_height: u64, block_height: Option<u64>) -> u32 {
    match block_height {
        Some(height) if height <= chain_height => {
            u32::try_from(chain_height - height + 1).unwrap_or(u32::MAX)
        }
        _ => 0,
    }
}

pub fn classify(confirmations: u32, confidence_level: u32) -> UtxoStatus {
    if confirmations > 0 && confirmations >= confidence_level {
        UtxoStatus::Confirmed
    } else {
        UtxoStatus::Pending
    }
}

/// Output owned by a tracked address, with depth computed at the last refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub amount: Amount,
    pub receiver_address: String,
    pub block_height: Option<u64>,
    pub confirmations: u32,
    pub status: UtxoStatus,
}

impl Utxo {
    pub fn from_node_output(
        receiver_address: &str,
        output: NodeOutput,
        chain_height: u64,
        confidence_level: u32,
    ) -> Self {
        let depth = confirmations(chain_height, output.block_height);
        Self {
            outpoint: output.outpoint,
            amount: output.amount,
            receiver_address: receiver_address.to_string(),
            block_height: output.block_height,
            confirmations: depth,
            status: classify(depth, confidence_level),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == UtxoStatus::Confirmed
    }

    /// Copy of this output marked as no longer seen by the node
    pub fn into_unknown(self) -> Self {
        Self {
            confirmations: 0,
            status: UtxoStatus::Unknown,
            ..self
        }
    }
}
