//! Scheduled UTXO refresh on the tokio runtime
//!
//! The worker owns the blocking registry and tracker and runs one refresh per
//! poll interval on `spawn_blocking` under a timeout. After a failure it waits
//! an exponentially growing delay before the next attempt; the core calls
//! themselves are never retried. Callers talk to it through a
//! [`CustodyHandle`] over an mpsc/oneshot request channel.

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult, CustodyResult};
use crate::ledger::LedgerQuery;
use crate::registry::{AddressBook, AddressRegistry};
use crate::rpc::execute_with_timeout;
use crate::rpc::retry::Backoff;
use crate::tracker::{BitcoinNode, RefreshReport, UtxoTracker};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Requests answered by the worker task
#[derive(Debug)]
pub enum WorkerRequest {
    /// Report of the last successful refresh, if any
    LatestReport {
        tx: oneshot::Sender<Option<Arc<RefreshReport>>>,
    },
    /// Refresh immediately and return the outcome
    RefreshNow {
        tx: oneshot::Sender<CustodyResult<Arc<RefreshReport>>>,
    },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub client_domain: String,
    pub poll_interval: Duration,
    pub timeout_seconds: u64,
    pub backoff: Backoff,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            client_domain: config.custody.client_domain.clone(),
            poll_interval: Duration::from_secs(config.custody.poll_interval_seconds),
            timeout_seconds: config.bitcoin_rpc.timeout_seconds,
            backoff: Backoff::from_config(&config.bitcoin_rpc),
        }
    }
}

/// Blocking state shared with `spawn_blocking`
struct Sources<L, N> {
    clients: AddressRegistry<L>,
    change: AddressRegistry<L>,
    client_domain: String,
    tracker: UtxoTracker<N>,
}

impl<L: LedgerQuery, N: BitcoinNode> Sources<L, N> {
    fn refresh(&self) -> CustodyResult<RefreshReport> {
        let book = AddressBook::load(&self.client_domain, &self.clients, &self.change)?;
        self.tracker.refresh(book.tracked_addresses())
    }
}

pub struct CustodyWorker<L, N> {
    sources: Arc<Sources<L, N>>,
    settings: WorkerSettings,
    error_count: Arc<AtomicU64>,
    latest: Option<Arc<RefreshReport>>,
}

impl<L, N> CustodyWorker<L, N>
where
    L: LedgerQuery + 'static,
    N: BitcoinNode + 'static,
{
    pub fn new(
        clients: AddressRegistry<L>,
        change: AddressRegistry<L>,
        tracker: UtxoTracker<N>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            sources: Arc::new(Sources {
                clients,
                change,
                client_domain: settings.client_domain.clone(),
                tracker,
            }),
            settings,
            error_count: Arc::new(AtomicU64::new(0)),
            latest: None,
        }
    }

    /// Start the worker task; the first refresh runs immediately
    pub fn spawn(self) -> CustodyHandle {
        let (request_tx, request_rx) = mpsc::channel(16);
        let error_count = Arc::clone(&self.error_count);
        let task = tokio::spawn(self.run(request_rx));
        CustodyHandle {
            request_tx,
            error_count,
            task,
        }
    }

    async fn run(mut self, mut request_rx: mpsc::Receiver<WorkerRequest>) {
        info!(
            "Custody worker started, polling every {:?}",
            self.settings.poll_interval
        );
        let mut next_refresh = Instant::now();

        loop {
            tokio::select! {
                _ = sleep_until(next_refresh) => {
                    next_refresh = Instant::now() + self.scheduled_refresh().await;
                }
                request = request_rx.recv() => match request {
                    Some(WorkerRequest::LatestReport { tx }) => {
                        let _ = tx.send(self.latest.clone());
                    }
                    Some(WorkerRequest::RefreshNow { tx }) => {
                        let result = self.refresh().await;
                        let _ = tx.send(result);
                    }
                    Some(WorkerRequest::Shutdown) | None => break,
                },
            }
        }

        info!("Custody worker shutting down");
    }

    /// Refresh on schedule; returns the delay until the next attempt
    async fn scheduled_refresh(&mut self) -> Duration {
        match self.refresh().await {
            Ok(report) => {
                self.settings.backoff.reset();
                debug!(
                    "Refresh at height {}: {} outputs",
                    report.chain_height,
                    report.utxos.len()
                );
                self.settings.poll_interval
            }
            Err(e) => {
                let delay = self.settings.backoff.next_delay();
                warn!("Refresh failed, retrying in {:?}: {}", delay, e);
                delay
            }
        }
    }

    async fn refresh(&mut self) -> CustodyResult<Arc<RefreshReport>> {
        let sources = Arc::clone(&self.sources);
        let result = execute_with_timeout(self.settings.timeout_seconds, "utxo refresh", move || {
            sources.refresh()
        })
        .await;

        match result {
            Ok(report) => {
                let report = Arc::new(report);
                self.latest = Some(Arc::clone(&report));
                Ok(report)
            }
            Err(e) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}

/// Client side of a running [`CustodyWorker`]
pub struct CustodyHandle {
    request_tx: mpsc::Sender<WorkerRequest>,
    error_count: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl CustodyHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> WorkerRequest,
    ) -> AppResult<T> {
        let (tx, rx) = oneshot::channel();
        self.request_tx
            .send(make(tx))
            .await
            .map_err(|_| AppError::Worker("Failed to send worker request".to_string()))?;
        rx.await
            .map_err(|_| AppError::Worker("Worker channel closed".to_string()))
    }

    pub async fn latest_report(&self) -> AppResult<Option<Arc<RefreshReport>>> {
        self.request(|tx| WorkerRequest::LatestReport { tx }).await
    }

    pub async fn refresh_now(&self) -> AppResult<Arc<RefreshReport>> {
        Ok(self.request(|tx| WorkerRequest::RefreshNow { tx }).await??)
    }

    /// Failed refreshes since start
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Stop the worker and wait for it to exit
    pub async fn shutdown(self) -> AppResult<()> {
        // A closed channel means the worker already stopped
        let _ = self.request_tx.send(WorkerRequest::Shutdown).await;
        self.task
            .await
            .map_err(|e| AppError::Worker(format!("Worker task failed: {}", e)))
    }
}
