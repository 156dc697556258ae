//! worker_status tool implementation.
//!
//! Reports the registration, the worker states and which pages are controlled.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ClientInfo, Registration};
use swcache_core::Error;

use crate::site::Site;

/// Parameters for the worker_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusParams {}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatusOutput {
    pub origin: String,
    /// False when the platform has no worker support.
    pub service_workers: bool,
    pub registration: Option<Registration>,
    pub clients: Vec<ClientInfo>,
    /// Background store writes still in flight.
    pub pending_writes: usize,
}

/// Implementation of the worker_status tool.
pub async fn status_impl(site: &Site, _params: WorkerStatusParams) -> Result<CallToolResult, McpError> {
    let host = site.host();
    let pending_writes = match host.active_worker().await {
        Some(worker) => worker.pending().len().await,
        None => 0,
    };

    let output = WorkerStatusOutput {
        origin: host.origin().to_string(),
        service_workers: site.config().service_workers,
        registration: host.registration().await,
        clients: host.clients().await,
        pending_writes,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
