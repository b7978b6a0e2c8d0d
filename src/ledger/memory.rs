use super::{BlockSource, LedgerQuery};
use crate::errors::{AppError, AppResult, CustodyError, CustodyResult};
use crate::types::{LedgerBlock, LedgerCommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::{debug, info};

/// owner account -> writer account -> key -> value
pub type DetailStore = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// JSON snapshot of a ledger: account details plus committed blocks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub account_details: DetailStore,
    #[serde(default)]
    pub blocks: Vec<LedgerBlock>,
}

impl LedgerSnapshot {
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: LedgerSnapshot = serde_json::from_str(&content).map_err(|e| {
            AppError::InvalidData(format!(
                "Failed to parse ledger snapshot {}: {}",
                path.display(),
                e
            ))
        })?;
        info!(
            "Loaded ledger snapshot {} ({} accounts, {} blocks)",
            path.display(),
            snapshot.account_details.len(),
            snapshot.blocks.len()
        );
        Ok(snapshot)
    }
}

/// Thread-safe ledger replica.
///
/// Committing a block records it and applies its `SetAccountDetail`
/// commands with the transaction creator as writer, the same way the ledger
/// itself scopes details.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    details: RwLock<DetailStore>,
    blocks: RwLock<Vec<LedgerBlock>>,
    unavailable: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            details: RwLock::new(snapshot.account_details),
            blocks: RwLock::new(snapshot.blocks),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_account_detail(&self, owner: &str, writer: &str, key: &str, value: &str) {
        let mut details = self.details.write().unwrap_or_else(|e| e.into_inner());
        details
            .entry(owner.to_string())
            .or_default()
            .entry(writer.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Record a block and apply its account details
    pub fn commit_block(&self, block: LedgerBlock) {
        for tx in &block.transactions {
            for command in &tx.commands {
                if let LedgerCommand::SetAccountDetail {
                    account_id,
                    key,
                    value,
                } = command
                {
                    self.set_account_detail(account_id, &tx.creator, key, value);
                }
            }
        }
        debug!("Committed ledger block {}", block.height);
        self.blocks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(block);
    }

    /// Simulate the ledger peer going away; queries fail with a transport error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn blocks(&self) -> Vec<LedgerBlock> {
        self.blocks.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Stream of the committed blocks, ordered by height
    pub fn replay(&self) -> ReplayStream {
        let mut blocks = self.blocks();
        blocks.sort_by_key(|block| block.height);
        ReplayStream::new(blocks)
    }
}

impl LedgerQuery for InMemoryLedger {
    fn get_account_details(
        &self,
        owner_account: &str,
        writer_account: &str,
    ) -> CustodyResult<BTreeMap<String, String>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CustodyError::ledger(format!(
                "query for details of {} failed: peer unavailable",
                owner_account
            )));
        }
        let details = self.details.read().unwrap_or_else(|e| e.into_inner());
        Ok(details
            .get(owner_account)
            .and_then(|writers| writers.get(writer_account))
            .cloned()
            .unwrap_or_default())
    }
}

/// Block source over an owned list of blocks
#[derive(Debug)]
pub struct ReplayStream {
    blocks: std::vec::IntoIter<LedgerBlock>,
}

impl ReplayStream {
    pub fn new(blocks: Vec<LedgerBlock>) -> Self {
        Self {
            blocks: blocks.into_iter(),
        }
    }
}

impl BlockSource for ReplayStream {
    fn next_block(&mut self) -> CustodyResult<Option<LedgerBlock>> {
        Ok(self.blocks.next())
    }
}
