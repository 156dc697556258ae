//! worker_script tool implementation.
//!
//! Renders the worker script exactly as the platform would receive it.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::Error;

use crate::error::ToolError;
use crate::site::Site;

/// Parameters for the worker_script tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerScriptParams {
    /// Path to request. Defaults to the configured script path.
    #[serde(default)]
    pub path: Option<String>,
}

/// Output from the worker_script tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerScriptOutput {
    pub path: String,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    /// Hex SHA-256 of the body; changes whenever the constants do.
    pub digest: String,
    pub body: String,
}

/// Implementation of the worker_script tool.
pub async fn script_impl(site: &Site, params: WorkerScriptParams) -> Result<CallToolResult, McpError> {
    let path = params.path.unwrap_or_else(|| site.config().script_path.clone());

    let served = site
        .scripts()
        .serve(&path)
        .await?
        .ok_or_else(|| ToolError::InvalidInput(format!("no worker script is served at {path}")))?;

    let header = |name: &str| {
        served
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let output = WorkerScriptOutput {
        content_type: header("content-type"),
        cache_control: header("cache-control"),
        digest: served.digest(),
        body: String::from_utf8_lossy(&served.body).into_owned(),
        path,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize script: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
