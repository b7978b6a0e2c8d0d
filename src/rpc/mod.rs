//! Bitcoin Core RPC integration
//!
//! - **client** - blocking `corepc-client` wrapper implementing `BitcoinNode`
//! - **retry** - exponential backoff and `spawn_blocking` timeout helpers
//!   used by the background worker

pub mod client;
pub mod retry;

pub use client::BitcoinRpcClient;
pub use retry::{calculate_next_backoff, execute_with_timeout};
