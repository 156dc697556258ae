//! The platform side of the worker: registration, update checks, lifecycle
//! dispatch, client control and fetch routing for one origin.
//!
//! A registration is updated only when the script bytes differ from the ones
//! it was installed from. A new worker installs, and activates right away if
//! it skipped waiting or the current worker controls no clients; otherwise it
//! waits until the last controlled client closes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use swcache_core::script::{SCRIPT_CONTENT_TYPE, script_digest};
use swcache_core::{CacheDb, PassReason, Request, Response, WorkerScript};
use tokio::sync::RwLock;
use url::Url;

use crate::fetch::{Network, NetworkError, same_origin, script_directory, within_scope};
use crate::worker::{
    ActivateEvent, CacheWorker, FetchEvent, FetchOutcome, InstallEvent, LifecycleError, ResponseSource, WorkerId,
    WorkerState,
};

/// Identifier of an open page.
pub type ClientId = u64;

/// Error type for registration failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("security error: {0}")]
    Security(String),

    #[error("scope {scope} is outside the script directory {directory}")]
    ScopeOutsideScriptDirectory { scope: String, directory: String },

    #[error("failed to fetch worker script: {0}")]
    ScriptFetch(String),

    #[error("failed to parse worker script: {0}")]
    ScriptParse(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl From<RegistrationError> for swcache_core::Error {
    fn from(err: RegistrationError) -> Self {
        swcache_core::Error::Registration(err.to_string())
    }
}

/// Where the platform loads worker script bytes from.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn load(&self, script_url: &Url) -> Result<Bytes, RegistrationError>;
}

#[async_trait]
impl ScriptSource for WorkerScript {
    async fn load(&self, script_url: &Url) -> Result<Bytes, RegistrationError> {
        match self.serve(script_url.path()) {
            Ok(Some(served)) => Ok(served.body),
            Ok(None) => Err(RegistrationError::ScriptFetch(format!("404 for {script_url}"))),
            Err(e) => Err(RegistrationError::ScriptFetch(e.to_string())),
        }
    }
}

/// Loads the script over the network, bypassing any worker.
pub struct NetworkScriptSource {
    network: Arc<dyn Network>,
}

impl NetworkScriptSource {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self { network }
    }
}

#[async_trait]
impl ScriptSource for NetworkScriptSource {
    async fn load(&self, script_url: &Url) -> Result<Bytes, RegistrationError> {
        let response = self
            .network
            .fetch(Request::get(script_url.clone()))
            .await
            .map_err(|e| RegistrationError::ScriptFetch(e.to_string()))?;

        if response.status != StatusCode::OK {
            return Err(RegistrationError::ScriptFetch(format!("status {} for {script_url}", response.status.as_u16())));
        }

        let content_type = response.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("");
        if !content_type.contains(SCRIPT_CONTENT_TYPE) && !content_type.contains("text/javascript") {
            return Err(RegistrationError::Security(format!("bad script MIME type: {content_type:?}")));
        }

        Ok(response.into_body())
    }
}

/// The `navigator.serviceWorker` seam the registrar talks to.
#[async_trait]
pub trait ServiceWorkerContainer: Send + Sync {
    async fn register(&self, script_path: &str, scope: &str) -> Result<Registration, RegistrationError>;
}

/// Snapshot of a worker for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerInfo {
    pub id: WorkerId,
    pub state: WorkerState,
    pub cache_name: String,
    pub max_file_size_bytes: u64,
}

/// Snapshot of the registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub scope: String,
    pub script_url: String,
    pub updated_at: DateTime<Utc>,
    pub active: Option<WorkerInfo>,
    pub waiting: Option<WorkerInfo>,
}

/// An open page.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub id: ClientId,
    pub url: String,
    pub controller: Option<WorkerId>,
}

/// How the host delivered a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The controlling worker produced it.
    Worker(ResponseSource),
    /// The worker declined the request.
    Passthrough(PassReason),
    /// No worker controls the client.
    Uncontrolled,
}

struct RegistrationRecord {
    scope: String,
    script_url: Url,
    script_digest: String,
    updated_at: DateTime<Utc>,
    active: Option<Arc<CacheWorker>>,
    waiting: Option<Arc<CacheWorker>>,
}

#[derive(Default)]
struct HostState {
    registration: Option<RegistrationRecord>,
    clients: HashMap<ClientId, ClientInfo>,
}

/// Platform host for a single origin and a single registration.
pub struct WorkerHost {
    origin: Url,
    storage: CacheDb,
    network: Arc<dyn Network>,
    scripts: Arc<dyn ScriptSource>,
    inner: RwLock<HostState>,
    next_client: AtomicU64,
}

async fn worker_info(worker: &CacheWorker) -> WorkerInfo {
    WorkerInfo {
        id: worker.id(),
        state: worker.state().await,
        cache_name: worker.cache_name().to_string(),
        max_file_size_bytes: worker.config().max_file_size_bytes,
    }
}

impl RegistrationRecord {
    async fn snapshot(&self) -> Registration {
        let active = match &self.active {
            Some(worker) => Some(worker_info(worker).await),
            None => None,
        };
        let waiting = match &self.waiting {
            Some(worker) => Some(worker_info(worker).await),
            None => None,
        };
        Registration {
            scope: self.scope.clone(),
            script_url: self.script_url.to_string(),
            updated_at: self.updated_at,
            active,
            waiting,
        }
    }
}

impl WorkerHost {
    pub fn new(origin: Url, storage: CacheDb, network: Arc<dyn Network>, scripts: Arc<dyn ScriptSource>) -> Self {
        Self { origin, storage, network, scripts, inner: RwLock::new(HostState::default()), next_client: AtomicU64::new(1) }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn storage(&self) -> &CacheDb {
        &self.storage
    }

    /// Open a page. It starts controlled if the active worker's scope covers it.
    pub async fn open_client(&self, url: Url) -> ClientId {
        let id = self.next_client.fetch_add(1, Ordering::SeqCst);
        let mut state = self.inner.write().await;

        let controller = state.registration.as_ref().and_then(|record| {
            let active = record.active.as_ref()?;
            within_scope(&self.origin, &record.scope, &url).then(|| active.id())
        });

        state.clients.insert(id, ClientInfo { id, url: url.to_string(), controller });
        tracing::debug!(client = id, %url, ?controller, "client opened");
        id
    }

    /// Close a page; a waiting worker activates once nothing uses the old one.
    pub async fn close_client(&self, id: ClientId) -> Result<(), LifecycleError> {
        let mut guard = self.inner.write().await;
        let HostState { registration, clients } = &mut *guard;
        clients.remove(&id);

        let Some(record) = registration.as_mut() else {
            return Ok(());
        };
        if record.waiting.is_none() || self.controls_any(record, clients) {
            return Ok(());
        }
        if let Some(waiting) = record.waiting.take() {
            self.activate_worker(record, clients, waiting).await?;
        }
        Ok(())
    }

    pub async fn clients(&self) -> Vec<ClientInfo> {
        let state = self.inner.read().await;
        let mut clients: Vec<ClientInfo> = state.clients.values().cloned().collect();
        clients.sort_by_key(|c| c.id);
        clients
    }

    pub async fn registration(&self) -> Option<Registration> {
        let state = self.inner.read().await;
        match &state.registration {
            Some(record) => Some(record.snapshot().await),
            None => None,
        }
    }

    /// The worker currently serving fetches, if any.
    pub async fn active_worker(&self) -> Option<Arc<CacheWorker>> {
        let state = self.inner.read().await;
        state.registration.as_ref().and_then(|record| record.active.clone())
    }

    /// Register (or update) the worker script for `scope`.
    pub async fn register(&self, script_path: &str, scope: &str) -> Result<Registration, RegistrationError> {
        let script_url = self
            .origin
            .join(script_path)
            .map_err(|e| RegistrationError::ScriptFetch(e.to_string()))?;
        let scope_url = self
            .origin
            .join(scope)
            .map_err(|e| RegistrationError::Security(e.to_string()))?;

        if !same_origin(&self.origin, &script_url) || !same_origin(&self.origin, &scope_url) {
            return Err(RegistrationError::Security("script and scope must share the page origin".into()));
        }

        let directory = script_directory(script_url.path());
        if !scope_url.path().starts_with(directory) {
            return Err(RegistrationError::ScopeOutsideScriptDirectory {
                scope: scope_url.path().to_string(),
                directory: directory.to_string(),
            });
        }

        let bytes = self.scripts.load(&script_url).await?;
        let digest = script_digest(&bytes);

        let mut guard = self.inner.write().await;
        let HostState { registration, clients } = &mut *guard;

        if let Some(record) = registration.as_mut()
            && record.script_digest == digest
        {
            tracing::debug!(script = %script_url, "worker script unchanged");
            record.scope = scope_url.path().to_string();
            return Ok(record.snapshot().await);
        }

        let config = WorkerScript::parse(&bytes).map_err(|e| RegistrationError::ScriptParse(e.to_string()))?;
        let worker = Arc::new(CacheWorker::new(config, self.storage.clone(), self.network.clone()));

        worker.transition(WorkerState::Installing).await?;
        let mut install = InstallEvent::new();
        worker.install(&mut install);
        install.settle().await;
        worker.transition(WorkerState::Installed).await?;
        tracing::info!(worker = worker.id(), cache = worker.cache_name(), "worker installed");

        let record = registration.get_or_insert_with(|| RegistrationRecord {
            scope: scope_url.path().to_string(),
            script_url: script_url.clone(),
            script_digest: String::new(),
            updated_at: Utc::now(),
            active: None,
            waiting: None,
        });
        record.scope = scope_url.path().to_string();
        record.script_url = script_url;
        record.script_digest = digest;
        record.updated_at = Utc::now();

        if let Some(superseded) = record.waiting.take() {
            superseded.transition(WorkerState::Redundant).await?;
        }

        if install.skip_waiting_requested() || !self.controls_any(record, clients) {
            self.activate_worker(record, clients, worker).await?;
        } else {
            tracing::info!(worker = worker.id(), "worker waiting for clients of the previous version to close");
            record.waiting = Some(worker);
        }

        Ok(record.snapshot().await)
    }

    /// Drop the registration. Stores are left as they are.
    pub async fn unregister(&self) -> Result<bool, LifecycleError> {
        let mut guard = self.inner.write().await;
        let HostState { registration, clients } = &mut *guard;
        let Some(record) = registration.take() else {
            return Ok(false);
        };

        for worker in [record.active, record.waiting].into_iter().flatten() {
            worker.transition(WorkerState::Redundant).await?;
        }
        for client in clients.values_mut() {
            client.controller = None;
        }
        Ok(true)
    }

    /// Deliver a request from `client`, through its controlling worker if any.
    pub async fn fetch(&self, client: ClientId, request: Request) -> Result<(Response, Route), NetworkError> {
        let worker = {
            let state = self.inner.read().await;
            let controller = state.clients.get(&client).and_then(|c| c.controller);
            state
                .registration
                .as_ref()
                .and_then(|record| record.active.clone())
                .filter(|active| Some(active.id()) == controller)
        };

        let worker = match worker {
            Some(worker) if worker.state().await.can_intercept_fetch() => Some(worker),
            _ => None,
        };
        let Some(worker) = worker else {
            let response = self.network.fetch(request).await?;
            return Ok((response, Route::Uncontrolled));
        };

        let event = FetchEvent::new(client, request);
        match worker.fetch(&event).await {
            FetchOutcome::Respond(result) => result.map(|(response, source)| (response, Route::Worker(source))),
            FetchOutcome::Passthrough(reason) => {
                let response = self.network.fetch(event.request).await?;
                Ok((response, Route::Passthrough(reason)))
            }
        }
    }

    /// Let all outstanding worker tasks finish.
    pub async fn shutdown(&self) -> usize {
        let workers: Vec<Arc<CacheWorker>> = {
            let state = self.inner.read().await;
            state
                .registration
                .as_ref()
                .map(|record| record.active.iter().chain(record.waiting.iter()).cloned().collect())
                .unwrap_or_default()
        };

        let mut settled = 0;
        for worker in workers {
            settled += worker.pending().settle().await;
        }
        settled
    }

    fn controls_any(&self, record: &RegistrationRecord, clients: &HashMap<ClientId, ClientInfo>) -> bool {
        match &record.active {
            Some(active) => clients.values().any(|c| c.controller == Some(active.id())),
            None => false,
        }
    }

    async fn activate_worker(
        &self, record: &mut RegistrationRecord, clients: &mut HashMap<ClientId, ClientInfo>, worker: Arc<CacheWorker>,
    ) -> Result<(), LifecycleError> {
        let previous = record.active.take();
        if let Some(previous) = &previous {
            previous.transition(WorkerState::Redundant).await?;
        }

        worker.transition(WorkerState::Activating).await?;
        let mut activate = ActivateEvent::new();
        worker.activate(&mut activate).await;
        activate.settle().await;
        worker.transition(WorkerState::Activated).await?;

        let previous_id = previous.as_ref().map(|p| p.id());
        let mut claimed = 0usize;
        for client in clients.values_mut() {
            let was_ours = previous_id.is_some() && client.controller == previous_id;
            let in_scope = Url::parse(&client.url)
                .map(|url| within_scope(&self.origin, &record.scope, &url))
                .unwrap_or(false);

            if was_ours || (activate.claim_requested() && in_scope) {
                client.controller = Some(worker.id());
                claimed += 1;
            }
        }

        tracing::info!(worker = worker.id(), cache = worker.cache_name(), claimed, "worker activated");
        record.active = Some(worker);
        Ok(())
    }
}

#[async_trait]
impl ServiceWorkerContainer for WorkerHost {
    async fn register(&self, script_path: &str, scope: &str) -> Result<Registration, RegistrationError> {
        WorkerHost::register(self, script_path, scope).await
    }
}
