//! End-to-end tests across ledger, registry, tracker, expansion and storage

#[path = "../common/mod.rs"]
mod common;

mod custody_flow;
mod replay_checkpoint;
