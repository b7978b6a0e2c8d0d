//! UTXO discovery and confirmation-depth gating
//!
//! The tracker asks a Bitcoin node for the outputs of every tracked address,
//! computes each output's depth against the current tip and classifies it.
//! It keeps the previous refresh in memory so outputs that vanish from the
//! node's view (chain reorganisation, or a spend) are reported explicitly.

use crate::errors::CustodyResult;
use crate::types::{NodeOutput, Utxo, UtxoStatus};
use crate::utils::currency::format_sats_as_btc;
use bitcoin::OutPoint;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Bitcoin node reads used by the tracker
pub trait BitcoinNode: Send + Sync {
    /// Unspent outputs paying to `address`; an unknown address yields none
    fn list_unspent_outputs(&self, address: &str) -> CustodyResult<Vec<NodeOutput>>;

    fn current_chain_height(&self) -> CustodyResult<u64>;
}

impl<T: BitcoinNode + ?Sized> BitcoinNode for Arc<T> {
    fn list_unspent_outputs(&self, address: &str) -> CustodyResult<Vec<NodeOutput>> {
        (**self).list_unspent_outputs(address)
    }

    fn current_chain_height(&self) -> CustodyResult<u64> {
        (**self).current_chain_height()
    }
}

/// Result of one refresh
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub chain_height: u64,
    /// Outputs currently reported by the node, ordered by outpoint
    pub utxos: Vec<Utxo>,
    /// Outputs that reached the confidence level in this refresh
    pub newly_confirmed: Vec<OutPoint>,
    /// Previously confirmed outputs that are now below the confidence level
    pub demoted: Vec<Utxo>,
    /// Previously confirmed outputs the node no longer reports, as `Unknown`
    pub reverted: Vec<Utxo>,
    /// Previously pending outputs the node no longer reports, as `Unknown`
    pub dropped: Vec<Utxo>,
}

impl RefreshReport {
    pub fn confirmed(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos.iter().filter(|utxo| utxo.is_confirmed())
    }

    pub fn pending(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos
            .iter()
            .filter(|utxo| utxo.status == UtxoStatus::Pending)
    }

    /// True when an output already counted as confirmed lost that status
    pub fn has_reversals(&self) -> bool {
        !self.reverted.is_empty() || !self.demoted.is_empty()
    }
}

pub struct UtxoTracker<N> {
    node: N,
    confidence_level: u32,
    /// Held for a whole refresh so overlapping calls apply in order
    refresh_guard: Mutex<()>,
    previous: Mutex<BTreeMap<OutPoint, Utxo>>,
}

impl<N: BitcoinNode> UtxoTracker<N> {
    /// A confidence level of 0 is raised to 1; mempool outputs are never confirmed
    pub fn new(node: N, confidence_level: u32) -> Self {
        if confidence_level == 0 {
            warn!("Confidence level 0 is not allowed, using 1");
        }
        Self {
            node,
            confidence_level: confidence_level.max(1),
            refresh_guard: Mutex::new(()),
            previous: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn confidence_level(&self) -> u32 {
        self.confidence_level
    }

    /// Poll the node for the outputs of `tracked_addresses`.
    ///
    /// Any node failure fails the whole refresh and leaves the remembered
    /// state untouched, so a reversal is still detected by the next
    /// successful refresh.
    pub fn refresh<I, S>(&self, tracked_addresses: I) -> CustodyResult<RefreshReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses: BTreeSet<String> = tracked_addresses
            .into_iter()
            .map(|address| address.as_ref().to_string())
            .collect();

        let _guard = self.refresh_guard.lock().unwrap_or_else(|e| e.into_inner());
        let chain_height = self.node.current_chain_height()?;

        let mut current: BTreeMap<OutPoint, Utxo> = BTreeMap::new();
        for address in &addresses {
            for output in self.node.list_unspent_outputs(address)? {
                let utxo =
                    Utxo::from_node_output(address, output, chain_height, self.confidence_level);
                current.entry(utxo.outpoint).or_insert(utxo);
            }
        }
        debug!(
            "Node reports {} outputs for {} addresses at height {}",
            current.len(),
            addresses.len(),
            chain_height
        );

        let mut previous = self.previous.lock().unwrap_or_else(|e| e.into_inner());
        let report = Self::diff(&previous, &current, chain_height);
        *previous = current;
        drop(previous);

        for utxo in &report.reverted {
            warn!(
                "Confirmed output {} ({} to {}) is no longer reported by the node",
                utxo.outpoint,
                format_sats_as_btc(utxo.amount),
                utxo.receiver_address
            );
        }
        for utxo in &report.demoted {
            warn!(
                "Output {} dropped below the confidence level ({} confirmations)",
                utxo.outpoint, utxo.confirmations
            );
        }
        if !report.newly_confirmed.is_empty() {
            info!(
                "{} outputs reached {} confirmations",
                report.newly_confirmed.len(),
                self.confidence_level
            );
        }
        Ok(report)
    }

    /// Last successfully refreshed outputs
    pub fn last_seen(&self) -> Vec<Utxo> {
        self.previous
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    fn diff(
        previous: &BTreeMap<OutPoint, Utxo>,
        current: &BTreeMap<OutPoint, Utxo>,
        chain_height: u64,
    ) -> RefreshReport {
        let mut report = RefreshReport {
            chain_height,
            utxos: current.values().cloned().collect(),
            ..RefreshReport::default()
        };

        for (outpoint, utxo) in current {
            let was_confirmed = previous
                .get(outpoint)
                .map(Utxo::is_confirmed)
                .unwrap_or(false);
            match (was_confirmed, utxo.is_confirmed()) {
                (false, true) => report.newly_confirmed.push(*outpoint),
                (true, false) => report.demoted.push(utxo.clone()),
                _ => {}
            }
        }

        for (outpoint, utxo) in previous {
            if current.contains_key(outpoint) {
                continue;
            }
            match utxo.status {
                UtxoStatus::Confirmed => report.reverted.push(utxo.clone().into_unknown()),
                _ => report.dropped.push(utxo.clone().into_unknown()),
            }
        }
        report
    }
}
