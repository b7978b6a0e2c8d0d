//! Spendable-balance projections over a tracked UTXO set
//!
//! Pure functions: nothing here touches the node or caches a total. The
//! spendable sum is always recomputed from the outputs handed in.

use crate::types::{Utxo, UtxoStatus};
use crate::utils::currency::{as_btc_string, format_btc};
use bitcoin::Amount;
use serde::Serialize;

/// Total of confirmed outputs. Empty input yields zero.
pub fn current_sum(utxos: &[Utxo]) -> Amount {
    utxos
        .iter()
        .filter(|utxo| utxo.status == UtxoStatus::Confirmed)
        .map(|utxo| utxo.amount)
        .sum()
}

/// Total of outputs with at least `min_confirmations`, ignoring outputs the
/// node no longer reports
pub fn available_sum(utxos: &[Utxo], min_confirmations: u32) -> AvailableSum {
    let total: Amount = eligible(utxos, min_confirmations)
        .map(|utxo| utxo.amount)
        .sum();
    AvailableSum {
        sum_btc: format_btc(total),
        sats: total.to_sat(),
    }
}

/// Outputs with at least `min_confirmations`, largest first
pub fn utxo_view(utxos: &[Utxo], min_confirmations: u32) -> UtxoSetView {
    let mut selected: Vec<&Utxo> = eligible(utxos, min_confirmations).collect();
    selected.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.outpoint.cmp(&b.outpoint)));

    UtxoSetView {
        utxo_list: selected.into_iter().map(UtxoEntry::from).collect(),
    }
}

fn eligible(utxos: &[Utxo], min_confirmations: u32) -> impl Iterator<Item = &Utxo> {
    utxos.iter().filter(move |utxo| {
        utxo.status != UtxoStatus::Unknown && utxo.confirmations >= min_confirmations
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableSum {
    pub sum_btc: String,
    #[serde(skip)]
    pub sats: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtxoSetView {
    pub utxo_list: Vec<UtxoEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtxoEntry {
    pub confirmations: u32,
    #[serde(serialize_with = "as_btc_string::serialize")]
    pub btc_amount: Amount,
    pub tx_hash: String,
    pub output_index: u32,
    pub receiver_address: String,
}

impl From<&Utxo> for UtxoEntry {
    fn from(utxo: &Utxo) -> Self {
        Self {
            confirmations: utxo.confirmations,
            btc_amount: utxo.amount,
            tx_hash: utxo.outpoint.txid.to_string(),
            output_index: utxo.outpoint.vout,
            receiver_address: utxo.receiver_address.clone(),
        }
    }
}
