//! Custody core type system
//!
//! - `address`: registered addresses and their generation metadata
//! - `signatory`: signatory sets and the versioned active snapshot
//! - `utxo`: tracked outputs, depth and confirmation class
//! - `ledger`: ledger blocks and membership change payloads

pub mod address;
pub mod ledger;
pub mod signatory;
pub mod utxo;

pub use address::{Address, AddressInfo};
pub use ledger::{LedgerBlock, LedgerCommand, LedgerTransaction, MembershipChange};
pub use signatory::{SignatoryId, SignatorySet, SignatorySnapshot, MAX_MULTISIG_KEYS};
pub use utxo::{classify, confirmations, NodeOutput, Utxo, UtxoStatus};
