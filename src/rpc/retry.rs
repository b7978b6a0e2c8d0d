//! Backoff and timeout helpers for the blocking custody calls
//!
//! The core never retries on its own: a failed refresh is returned to the
//! caller. The background worker uses these helpers to run the blocking
//! registry/tracker calls off the async runtime and to space out attempts
//! after a failure.

use crate::config::BitcoinRpcConfig;
use crate::errors::{CustodyError, CustodyResult, RpcError};
use std::time::Duration;
use tokio::time::timeout;

/// Calculate next backoff duration using exponential backoff with a maximum cap
///
/// `new_backoff = min(current_backoff * multiplier, max_backoff)`
///
/// # Example
/// ```
/// use std::time::Duration;
/// use btc_custody_sync::rpc::calculate_next_backoff;
///
/// let backoff = Duration::from_millis(100);
/// let next = calculate_next_backoff(backoff, 2.0, 30);
/// assert_eq!(next, Duration::from_millis(200));
/// ```
pub fn calculate_next_backoff(
    current_backoff: Duration,
    multiplier: f64,
    max_backoff_seconds: u64,
) -> Duration {
    Duration::from_millis((current_backoff.as_millis() as f64 * multiplier) as u64)
        .min(Duration::from_secs(max_backoff_seconds))
}

/// Delay between failed attempts, grown with [`calculate_next_backoff`]
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    current: Option<Duration>,
    multiplier: f64,
    max_backoff_seconds: u64,
}

impl Backoff {
    pub fn new(initial: Duration, multiplier: f64, max_backoff_seconds: u64) -> Self {
        Self {
            initial,
            current: None,
            multiplier,
            max_backoff_seconds,
        }
    }

    pub fn from_config(config: &BitcoinRpcConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_backoff_ms),
            config.backoff_multiplier,
            config.max_backoff_seconds,
        )
    }

    /// Delay before the next attempt; the first call returns the initial delay
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.initial.min(Duration::from_secs(self.max_backoff_seconds)),
            Some(current) => {
                calculate_next_backoff(current, self.multiplier, self.max_backoff_seconds)
            }
        };
        self.current = Some(delay);
        delay
    }

    /// Back to the initial delay after a success
    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Run a blocking custody operation on `spawn_blocking` under a timeout.
///
/// An elapsed timeout or a panicked task is reported as a node transport
/// failure naming `operation`; the operation's own error is passed through.
///
/// # Example
/// ```no_run
/// use btc_custody_sync::errors::CustodyResult;
/// use btc_custody_sync::rpc::execute_with_timeout;
///
/// async fn example() -> CustodyResult<u64> {
///     execute_with_timeout(30, "getblockchaininfo", || Ok(840_000)).await
/// }
/// ```
pub async fn execute_with_timeout<T, F>(
    timeout_seconds: u64,
    operation: &str,
    blocking: F,
) -> CustodyResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CustodyResult<T> + Send + 'static,
{
    match timeout(
        Duration::from_secs(timeout_seconds),
        tokio::task::spawn_blocking(blocking),
    )
    .await
    {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(CustodyError::node(format!(
            "{} task failed: {}",
            operation, join_error
        ))),
        Err(_) => Err(RpcError::Timeout {
            timeout_seconds,
            operation: operation.to_string(),
        }
        .into()),
    }
}
