//! Component tests against the public API, one module per component

#[path = "../common/mod.rs"]
mod common;

mod expansion;
mod registry;
mod rpc;
