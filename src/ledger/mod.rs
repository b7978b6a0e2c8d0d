//! Ledger collaborator interfaces
//!
//! The custody core never talks to the ledger network directly. It reads
//! account details through [`LedgerQuery`] and receives committed blocks
//! through [`BlockSource`]; the block streaming infrastructure lives behind
//! these traits.
//!
//! - **memory** - `InMemoryLedger`, a ledger replica built from committed
//!   blocks or loaded from a JSON snapshot file

pub mod memory;

pub use memory::{InMemoryLedger, LedgerSnapshot, ReplayStream};

use crate::errors::CustodyResult;
use crate::types::LedgerBlock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key/value account-detail reads
pub trait LedgerQuery: Send + Sync {
    /// Details stored on `owner_account` by `writer_account`, keyed by detail key
    fn get_account_details(
        &self,
        owner_account: &str,
        writer_account: &str,
    ) -> CustodyResult<BTreeMap<String, String>>;
}

impl<T: LedgerQuery + ?Sized> LedgerQuery for Arc<T> {
    fn get_account_details(
        &self,
        owner_account: &str,
        writer_account: &str,
    ) -> CustodyResult<BTreeMap<String, String>> {
        (**self).get_account_details(owner_account, writer_account)
    }
}

/// Committed blocks in increasing height order
pub trait BlockSource {
    /// Next block, or `None` once the source is drained
    fn next_block(&mut self) -> CustodyResult<Option<LedgerBlock>>;
}
