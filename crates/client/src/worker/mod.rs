//! The cache worker: lifecycle handlers and the fetch interception policy.
//!
//! ### Install
//! - Skip waiting; nothing is pre-cached.
//!
//! ### Activate
//! - Delete every store whose name is not this worker's cache name.
//! - Claim open clients once the sweep has settled.
//!
//! ### Fetch
//! - Non-GET, websocket, `/my/`, `/api/` and non-asset paths pass through.
//! - Cache hit → stored response, no network.
//! - Miss → network; a 200 `basic` response whose declared length is within
//!   the ceiling is duplicated and the copy written in the background.
//!
//! Store failures never reach the caller: a failed lookup is a miss and a
//! failed write is dropped.

pub mod events;
pub mod lifecycle;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::StatusCode;
use swcache_core::{CacheDb, Error, Interception, PassReason, PathPolicy, Request, Response, ResponseKind, WorkerConfig};
use tokio::sync::RwLock;

use crate::fetch::{Network, NetworkError};

pub use events::{ActivateEvent, FetchEvent, InstallEvent, PendingWork};
pub use lifecycle::{LifecycleError, WorkerState};

/// Process-unique worker identifier.
pub type WorkerId = u64;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Why a network response was or wasn't written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A copy was queued for writing.
    Stored,
    /// Status other than 200.
    NotOk,
    /// Not a same-origin `basic` response.
    NotBasic,
    /// Declared Content-Length above the ceiling.
    TooLarge,
}

impl Admission {
    pub fn as_str(self) -> &'static str {
        match self {
            Admission::Stored => "stored",
            Admission::NotOk => "not_ok",
            Admission::NotBasic => "not_basic",
            Admission::TooLarge => "too_large",
        }
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network(Admission),
}

/// Result of offering a fetch event to the worker.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the platform performs the request itself.
    Passthrough(PassReason),
    /// Intercepted; a network failure is handed back unchanged.
    Respond(Result<(Response, ResponseSource), NetworkError>),
}

/// A cache worker built from one version of the worker script.
pub struct CacheWorker {
    id: WorkerId,
    config: Arc<WorkerConfig>,
    policy: PathPolicy,
    storage: CacheDb,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    pending: PendingWork,
}

impl std::fmt::Debug for CacheWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWorker")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CacheWorker {
    pub fn new(config: WorkerConfig, storage: CacheDb, network: Arc<dyn Network>) -> Self {
        Self {
            id: NEXT_WORKER_ID.fetch_add(1, Ordering::SeqCst),
            config: Arc::new(config),
            policy: PathPolicy::default(),
            storage,
            network,
            state: RwLock::new(WorkerState::Parsed),
            pending: PendingWork::new(),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Move to `next`, rejecting steps the lifecycle doesn't allow.
    pub async fn transition(&self, next: WorkerState) -> Result<(), LifecycleError> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition { from: *state, to: next });
        }
        tracing::debug!(worker = self.id, from = %*state, to = %next, "worker state change");
        *state = next;
        Ok(())
    }

    /// Work started by fetch handling that the platform must let finish.
    pub fn pending(&self) -> &PendingWork {
        &self.pending
    }

    pub fn install(&self, event: &mut InstallEvent) {
        event.skip_waiting();
    }

    pub async fn activate(&self, event: &mut ActivateEvent) {
        let storage = self.storage.clone();
        let current = self.config.cache_name.clone();
        event.wait_until(async move {
            match sweep(&storage, &current).await {
                Ok(deleted) if !deleted.is_empty() => {
                    tracing::info!(cache = %current, deleted = ?deleted, "deleted old cache generations");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(cache = %current, error = %e, "cache sweep failed"),
            }
        })
        .await;
        event.claim();
    }

    /// Handle one intercepted request.
    pub async fn fetch(&self, event: &FetchEvent) -> FetchOutcome {
        let request = &event.request;

        if let Interception::Pass(reason) = self.policy.evaluate(request) {
            return FetchOutcome::Passthrough(reason);
        }

        match self.storage.match_request(&self.config.cache_name, request).await {
            Ok(Some(cached)) => {
                tracing::debug!(url = %request.url, "cache hit");
                return FetchOutcome::Respond(Ok((cached, ResponseSource::Cache)));
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(url = %request.url, error = %e, "cache lookup failed, treating as miss"),
        }

        let response = match self.network.fetch(request.clone()).await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Respond(Err(e)),
        };

        let admission = self.admit(request, &response);
        if admission == Admission::Stored {
            self.store(request.clone(), response.duplicate()).await;
        }

        FetchOutcome::Respond(Ok((response, ResponseSource::Network(admission))))
    }

    /// Qualification checks, in order, stopping at the first failure.
    fn admit(&self, request: &Request, response: &Response) -> Admission {
        if response.status != StatusCode::OK {
            return Admission::NotOk;
        }
        if response.kind != ResponseKind::Basic {
            return Admission::NotBasic;
        }
        if let Some(length) = response.declared_length()
            && length > self.config.max_file_size_bytes
        {
            tracing::warn!(
                url = %request.url,
                content_length = length,
                max_file_size_bytes = self.config.max_file_size_bytes,
                "skipping cache for large file"
            );
            return Admission::TooLarge;
        }
        Admission::Stored
    }

    /// Write `copy` in the background; the caller never waits on it.
    async fn store(&self, request: Request, copy: Response) {
        let storage = self.storage.clone();
        let cache_name = self.config.cache_name.clone();
        self.pending.wait_until(async move {
            if let Err(e) = storage.put(&cache_name, &request, copy).await {
                tracing::debug!(url = %request.url, error = %e, "cache write dropped");
            }
        })
        .await;
    }
}

/// Delete every store not named `current`. Returns the deleted names.
pub async fn sweep(storage: &CacheDb, current: &str) -> Result<Vec<String>, Error> {
    let mut deleted = Vec::new();
    for name in storage.keys().await? {
        if name != current && storage.delete(&name).await? {
            deleted.push(name);
        }
    }
    Ok(deleted)
}
