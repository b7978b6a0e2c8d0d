use super::{CustodyService, ExpansionOutcome, SignatorySetExpander};
use crate::errors::CustodyResult;
use crate::ledger::BlockSource;
use crate::types::{LedgerBlock, SignatorySnapshot};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Applies every block to the expander of each custody service
pub struct ExpansionDispatcher {
    expanders: Vec<SignatorySetExpander>,
}

/// Totals of a dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub blocks: u64,
    pub applied: u64,
    pub rejected: u64,
    pub last_height: Option<u64>,
}

impl ExpansionDispatcher {
    pub fn new(expanders: Vec<SignatorySetExpander>) -> Self {
        Self { expanders }
    }

    pub fn expander(&self, service: CustodyService) -> Option<&SignatorySetExpander> {
        self.expanders
            .iter()
            .find(|expander| expander.service() == service)
    }

    /// Feed `block` to every expander. A failure in one service does not
    /// stop the others; each result is returned for the caller to report.
    pub fn dispatch(
        &self,
        block: &LedgerBlock,
    ) -> Vec<(CustodyService, CustodyResult<ExpansionOutcome>)> {
        self.expanders
            .iter()
            .map(|expander| {
                let result = expander.expand(block);
                if let Err(e) = &result {
                    error!("[{}] block {} not applied: {}", expander.service(), block.height, e);
                }
                (expander.service(), result)
            })
            .collect()
    }

    /// Drain `source`, dispatching each block.
    ///
    /// Only a failure of the source itself stops the run; rejected or
    /// undecodable membership updates are counted and logged.
    pub fn run<S: BlockSource>(&self, source: &mut S) -> CustodyResult<DispatchSummary> {
        let mut summary = DispatchSummary::default();
        while let Some(block) = source.next_block()? {
            for (_, result) in self.dispatch(&block) {
                match result {
                    Ok(ExpansionOutcome::Applied { .. }) => summary.applied += 1,
                    Ok(_) => {}
                    Err(_) => summary.rejected += 1,
                }
            }
            summary.blocks += 1;
            summary.last_height = Some(block.height);
        }
        info!(
            "Dispatched {} blocks: {} set updates, {} rejected",
            summary.blocks, summary.applied, summary.rejected
        );
        Ok(summary)
    }

    /// Active snapshot of every service
    pub fn snapshots(&self) -> BTreeMap<CustodyService, Arc<SignatorySnapshot>> {
        self.expanders
            .iter()
            .map(|expander| (expander.service(), expander.current_signatory_set()))
            .collect()
    }
}
