//! Bounded-concurrency asset retrieval.
//!
//! [`AssetFetcher::fetch`] walks the manifest in batches of `concurrency`
//! items. Every item of a batch runs as its own task on a [`JoinSet`]; the
//! next batch starts only once all of them settled. Tasks own their
//! [`DownloadState`] and publish cloned snapshots over a channel, which the
//! coordinating task forwards to the [`ProgressObserver`].
//!
//! Failures are per item and never abort siblings. There is no automatic
//! retry: callers re-run [`AssetFetcher::fetch`] with
//! [`FetchOutcome::failed_descriptors`].

pub mod transport;

pub use transport::{AssetTransport, ReqwestTransport, TransferBody, DEFAULT_USER_AGENT};

use crate::models::{AssetDescriptor, DownloadState};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on the buffer reserved up front from a declared length.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server responded with HTTP {status}")]
    Server { status: u16 },

    #[error("Download cancelled")]
    Cancelled,
}

/// Receives progress from a running fetch.
///
/// Called from the coordinating task only, never concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait ProgressObserver: Send + Sync {
    fn on_asset(&self, state: &DownloadState);

    /// `completed` counts settled items (success, failure or cancellation).
    fn on_overall(&self, completed: usize, total: usize);
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_asset(&self, _state: &DownloadState) {}
    fn on_overall(&self, _completed: usize, _total: usize) {}
}

/// Cancellation handles for one fetch.
///
/// Each asset gets a child of a single root token, so [`cancel_all`](Self::cancel_all)
/// reaches every transfer and [`cancel`](Self::cancel) only one. Tokens can be
/// cancelled before their transfer starts.
#[derive(Debug, Clone, Default)]
pub struct FetchControl {
    root: CancellationToken,
    items: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl FetchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_for(&self, asset_id: &str) -> CancellationToken {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items
            .entry(asset_id.to_string())
            .or_insert_with(|| self.root.child_token())
            .clone()
    }

    pub fn cancel(&self, asset_id: &str) {
        tracing::info!("Cancelling download of {}", asset_id);
        self.token_for(asset_id).cancel();
    }

    pub fn cancel_all(&self) {
        tracing::info!("Cancelling all downloads");
        self.root.cancel();
    }

    /// Looks up without registering: ids never handed a token only reflect
    /// [`cancel_all`](Self::cancel_all).
    pub fn is_cancelled(&self, asset_id: &str) -> bool {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items
            .get(asset_id)
            .map_or_else(|| self.root.is_cancelled(), CancellationToken::is_cancelled)
    }
}

/// Everything a fetch produced, keyed by asset id.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub assets: IndexMap<String, Vec<u8>>,
    pub failures: IndexMap<String, FetchError>,
    pub states: IndexMap<String, DownloadState>,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Manifest entries that did not arrive, in manifest order.
    pub fn failed_descriptors(&self, manifest: &[AssetDescriptor]) -> Vec<AssetDescriptor> {
        manifest
            .iter()
            .filter(|a| self.failures.contains_key(&a.id))
            .cloned()
            .collect()
    }

    pub fn cancelled_ids(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|(_, e)| **e == FetchError::Cancelled)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Fold a retry's outcome into this one.
    pub fn merge(&mut self, retry: FetchOutcome) {
        for (id, bytes) in retry.assets {
            self.failures.shift_remove(&id);
            self.assets.insert(id, bytes);
        }
        self.failures.extend(retry.failures);
        self.states.extend(retry.states);
    }
}

pub struct AssetFetcher<T: AssetTransport> {
    transport: Arc<T>,
    concurrency: usize,
    timeout: Duration,
}

impl AssetFetcher<ReqwestTransport> {
    pub fn http(user_agent: &str) -> Result<Self, FetchError> {
        Ok(Self::new(ReqwestTransport::new(user_agent)?))
    }
}

impl<T: AssetTransport> AssetFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn fetch(
        &self,
        items: &[AssetDescriptor],
        control: &FetchControl,
        observer: &dyn ProgressObserver,
    ) -> FetchOutcome {
        let total = items.len();
        let mut outcome = FetchOutcome::default();
        let mut settled = 0;

        tracing::info!(
            "Fetching {} assets, {} at a time",
            total,
            self.concurrency
        );

        for (batch_index, batch) in items.chunks(self.concurrency).enumerate() {
            tracing::debug!("Starting batch {} ({} items)", batch_index + 1, batch.len());

            let (tx, mut rx) = mpsc::unbounded_channel::<DownloadState>();
            let mut tasks = JoinSet::new();

            for item in batch {
                let initial = DownloadState::pending(&item.id, item.estimated_size_bytes);
                observer.on_asset(&initial);

                tasks.spawn(download(
                    Arc::clone(&self.transport),
                    item.clone(),
                    control.token_for(&item.id),
                    self.timeout,
                    tx.clone(),
                ));
            }
            drop(tx);

            loop {
                tokio::select! {
                    biased;
                    Some(state) = rx.recv() => observer.on_asset(&state),
                    joined = tasks.join_next() => {
                        let Some(joined) = joined else { break };

                        // Snapshots sent before the task returned are already queued.
                        while let Ok(state) = rx.try_recv() {
                            observer.on_asset(&state);
                        }

                        match joined {
                            Ok((state, result)) => {
                                record(&mut outcome, state, result);
                                settled += 1;
                                observer.on_overall(settled, total);
                            }
                            Err(e) => tracing::error!("Download task failed: {}", e),
                        }
                    }
                }
            }

            // Tasks that panicked never reported back.
            for item in batch {
                if !outcome.states.contains_key(&item.id) {
                    let mut state = DownloadState::pending(&item.id, item.estimated_size_bytes);
                    let error = FetchError::Network("download task aborted".to_string());
                    state.fail(error.to_string());
                    observer.on_asset(&state);
                    record(&mut outcome, state, Err(error));
                    settled += 1;
                    observer.on_overall(settled, total);
                }
            }
        }

        tracing::info!(
            "Fetch finished: {} succeeded, {} failed",
            outcome.assets.len(),
            outcome.failures.len()
        );
        outcome
    }
}

fn record(outcome: &mut FetchOutcome, state: DownloadState, result: Result<Vec<u8>, FetchError>) {
    let id = state.asset_id.clone();
    match result {
        Ok(bytes) => {
            outcome.assets.insert(id.clone(), bytes);
        }
        Err(e) => {
            outcome.failures.insert(id.clone(), e);
        }
    }
    outcome.states.insert(id, state);
}

async fn download<T: AssetTransport>(
    transport: Arc<T>,
    item: AssetDescriptor,
    token: CancellationToken,
    timeout: Duration,
    progress: mpsc::UnboundedSender<DownloadState>,
) -> (DownloadState, Result<Vec<u8>, FetchError>) {
    let mut state = DownloadState::pending(&item.id, item.estimated_size_bytes);

    let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(FetchError::Cancelled),
        transferred = tokio::time::timeout(
            timeout,
            transfer(&*transport, &item, timeout, &mut state, &progress),
        ) => transferred.unwrap_or(Err(FetchError::Timeout(timeout))),
    };

    match &result {
        Ok(bytes) => {
            state.complete();
            tracing::debug!("Downloaded {} ({} bytes)", item.id, bytes.len());
        }
        Err(FetchError::Cancelled) => {
            state.cancel();
            tracing::info!("Download of {} cancelled", item.id);
        }
        Err(e) => {
            state.fail(e.to_string());
            tracing::error!("Download of {} from {} failed: {}", item.id, item.resolved_url, e);
        }
    }
    let _ = progress.send(state.clone());

    (state, result)
}

async fn transfer<T: AssetTransport>(
    transport: &T,
    item: &AssetDescriptor,
    timeout: Duration,
    state: &mut DownloadState,
    progress: &mpsc::UnboundedSender<DownloadState>,
) -> Result<Vec<u8>, FetchError> {
    let mut body = transport.open(&item.resolved_url, timeout).await?;

    state.start(body.content_length());
    let _ = progress.send(state.clone());

    let started = Instant::now();
    let mut bytes = Vec::with_capacity(state.total_bytes.min(MAX_PREALLOCATION) as usize);
    while let Some(chunk) = body.next_chunk().await? {
        bytes.extend_from_slice(&chunk);
        state.record_chunk(chunk.len(), started.elapsed());
        let _ = progress.send(state.clone());
    }

    Ok(bytes)
}
