//! worker_update tool implementation.
//!
//! Deploys new worker constants and runs the update check, which installs
//! and activates the new worker and sweeps stores from older versions.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::Registration;
use swcache_core::{Error, WorkerConfig};

use crate::error::ToolError;
use crate::site::Site;

/// Parameters for the worker_update tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerUpdateParams {
    /// New version token. The store name becomes `<prefix>-<version>`.
    #[serde(default)]
    pub cache_version: Option<String>,

    /// New size ceiling in bytes.
    #[serde(default)]
    pub max_file_size_bytes: Option<u64>,
}

/// Output from the worker_update tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerUpdateOutput {
    pub previous_cache_name: String,
    pub registration: Registration,
    /// Store names left after activation.
    pub stores: Vec<String>,
}

/// Implementation of the worker_update tool.
pub async fn update_impl(site: &Site, params: WorkerUpdateParams) -> Result<CallToolResult, McpError> {
    if params.cache_version.is_none() && params.max_file_size_bytes.is_none() {
        return Err(ToolError::InvalidInput("one of cache_version or max_file_size_bytes is required".into()).into());
    }
    if let Some(version) = &params.cache_version
        && version.trim().is_empty()
    {
        return Err(ToolError::InvalidInput("cache_version cannot be empty".into()).into());
    }
    if params.max_file_size_bytes == Some(0) {
        return Err(ToolError::InvalidInput("max_file_size_bytes must be greater than 0".into()).into());
    }
    if site.container().is_none() {
        return Err(Error::NoWorker("worker support is disabled".into()).into());
    }

    let current = site.scripts().config().await;
    let next = WorkerConfig {
        cache_name: match &params.cache_version {
            Some(version) => format!("{}-{}", site.config().cache_prefix, version.trim()),
            None => current.cache_name.clone(),
        },
        max_file_size_bytes: params.max_file_size_bytes.unwrap_or(current.max_file_size_bytes),
    };

    let previous = site.scripts().replace(next).await;
    tracing::info!(from = %previous.cache_name, "deploying new worker script");

    let registration = match site.update().await {
        Ok(registration) => registration,
        Err(e) => {
            site.scripts().replace(previous).await;
            tracing::warn!(error = %e, "worker update failed, previous script restored");
            return Err(e.into());
        }
    };
    let stores = site.host().storage().keys().await?;

    let output = WorkerUpdateOutput { previous_cache_name: previous.cache_name, registration, stores };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize update: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubNetwork, result_json, test_config};
    use swcache_core::{AppConfig, CacheDb, Request};

    async fn site() -> Site {
        let storage = CacheDb::open_in_memory().await.unwrap();
        Site::with_network(test_config(), storage, StubNetwork::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_update_requires_a_change() {
        let site = site().await;
        assert!(update_impl(&site, WorkerUpdateParams::default()).await.is_err());

        let params = WorkerUpdateParams { cache_version: Some("  ".into()), max_file_size_bytes: None };
        assert!(update_impl(&site, params).await.is_err());

        let params = WorkerUpdateParams { cache_version: None, max_file_size_bytes: Some(0) };
        assert!(update_impl(&site, params).await.is_err());
    }

    #[tokio::test]
    async fn test_version_bump_sweeps_old_store() {
        let site = site().await;
        let request = Request::parse_get("https://example.com/web/assets/app.js").unwrap();
        site.host().fetch(site.page(), request).await.unwrap();
        site.shutdown().await;
        assert!(site.host().storage().has("swcache-1").await.unwrap());

        let params = WorkerUpdateParams { cache_version: Some("2".into()), max_file_size_bytes: None };
        let output = result_json(&update_impl(&site, params).await.unwrap());

        assert_eq!(output["previous_cache_name"], "swcache-1");
        assert_eq!(output["registration"]["active"]["cache_name"], "swcache-2");
        assert_eq!(output["stores"], serde_json::json!([]));
        assert!(!site.host().storage().has("swcache-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_update_restores_served_script() {
        // a scope above the script directory makes every registration fail
        let config = AppConfig { script_path: "/static/sw.js".into(), ..test_config() };
        let storage = CacheDb::open_in_memory().await.unwrap();
        let site = Site::with_network(config, storage, StubNetwork::new()).await.unwrap();
        assert!(site.host().registration().await.is_none());

        let params = WorkerUpdateParams { cache_version: Some("2".into()), max_file_size_bytes: Some(5) };
        assert!(update_impl(&site, params).await.is_err());

        let served = site.scripts().config().await;
        assert_eq!(served.cache_name, "swcache-1");
        assert_eq!(served.max_file_size_bytes, site.config().max_file_size_bytes);
    }

    #[tokio::test]
    async fn test_ceiling_change_keeps_store() {
        let site = site().await;
        let request = Request::parse_get("https://example.com/web/assets/app.js").unwrap();
        site.host().fetch(site.page(), request).await.unwrap();
        site.shutdown().await;

        let params = WorkerUpdateParams { cache_version: None, max_file_size_bytes: Some(2_000_000) };
        let output = result_json(&update_impl(&site, params).await.unwrap());

        assert_eq!(output["registration"]["active"]["max_file_size_bytes"], 2_000_000);
        assert_eq!(output["stores"], serde_json::json!(["swcache-1"]));
    }
}
