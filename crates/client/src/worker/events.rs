//! Events the platform delivers to a worker, and the pending-work handle
//! that keeps the worker alive until work it started has settled.

use std::future::Future;
use std::sync::Arc;

use swcache_core::Request;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::host::ClientId;

/// Spawned tasks are detached, never aborted, when the last handle goes away.
#[derive(Debug, Default)]
struct TaskSet(JoinSet<()>);

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.0.detach_all();
    }
}

/// Set of in-flight tasks a worker asked the platform to wait for.
///
/// Cloning shares the same set. Tasks are spawned immediately and run to
/// completion; nothing here cancels them.
#[derive(Debug, Clone, Default)]
pub struct PendingWork {
    tasks: Arc<Mutex<TaskSet>>,
}

impl PendingWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` and keep track of it until it settles.
    pub async fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.lock().await.0.spawn(work);
    }

    /// Number of tasks that have not been reaped yet.
    pub async fn len(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.0.try_join_next() {
            log_join_error(result);
        }
        tasks.0.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Wait for every tracked task, including ones added while waiting.
    ///
    /// Returns how many tasks were awaited.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            // the lock is released before joining so running tasks can add more
            let mut batch = std::mem::take(&mut *self.tasks.lock().await);
            if batch.0.is_empty() {
                return settled;
            }
            while let Some(result) = batch.0.join_next().await {
                log_join_error(result);
                settled += 1;
            }
        }
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "pending worker task did not complete");
    }
}

/// Dispatched when a byte-different script is installed.
#[derive(Debug, Default)]
pub struct InstallEvent {
    skip_waiting: bool,
    pending: PendingWork,
}

impl InstallEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask to activate without waiting for the old worker's clients to go away.
    pub fn skip_waiting(&mut self) {
        self.skip_waiting = true;
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting
    }

    pub async fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.wait_until(work).await;
    }

    pub async fn settle(&self) -> usize {
        self.pending.settle().await
    }
}

/// Dispatched before a worker starts serving.
#[derive(Debug, Default)]
pub struct ActivateEvent {
    claim: bool,
    pending: PendingWork,
}

impl ActivateEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take control of all open clients in scope once activation settles.
    pub fn claim(&mut self) {
        self.claim = true;
    }

    pub fn claim_requested(&self) -> bool {
        self.claim
    }

    pub async fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.wait_until(work).await;
    }

    pub async fn settle(&self) -> usize {
        self.pending.settle().await
    }
}

/// A request from a controlled client, offered to the worker.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub client_id: ClientId,
    pub request: Request,
}

impl FetchEvent {
    pub fn new(client_id: ClientId, request: Request) -> Self {
        Self { client_id, request }
    }
}
