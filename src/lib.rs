//! Bitcoin custody state synchroniser
//!
//! Keeps three pieces of custody state consistent with a permissioned ledger
//! and a Bitcoin node: the registry of generated multisig addresses, the
//! confirmation-gated set of UTXOs held by those addresses, and the active
//! signatory set of each custody service.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod expansion;
pub mod ledger;
pub mod registry;
pub mod rpc;
pub mod tracker;
pub mod types;
pub mod utils;
pub mod worker;
