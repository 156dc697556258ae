//! Page-side registration, run once when the page finishes loading.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::host::{Registration, ServiceWorkerContainer};

/// Registers the worker script once per page load.
///
/// Failures are logged and swallowed; the page keeps working without a worker.
#[derive(Debug)]
pub struct Registrar {
    script_path: String,
    scope: String,
    attempted: AtomicBool,
}

impl Registrar {
    pub fn new(script_path: impl Into<String>, scope: impl Into<String>) -> Self {
        Self { script_path: script_path.into(), scope: scope.into(), attempted: AtomicBool::new(false) }
    }

    /// Load handler. `container` is `None` when the environment has no
    /// worker support, in which case nothing happens at all.
    pub async fn on_load(&self, container: Option<&dyn ServiceWorkerContainer>) -> Option<Registration> {
        let container = container?;
        if self.attempted.swap(true, Ordering::SeqCst) {
            return None;
        }

        match container.register(&self.script_path, &self.scope).await {
            Ok(registration) => {
                tracing::info!(scope = %registration.scope, "worker registered with scope");
                Some(registration)
            }
            Err(e) => {
                tracing::error!(script = %self.script_path, error = %e, "worker registration failed");
                None
            }
        }
    }
}
