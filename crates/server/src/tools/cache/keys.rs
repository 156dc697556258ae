//! cache_keys tool implementation.
//!
//! Lists store names, and the entries of one store.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, Error, cache::EntrySummary};

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Store to list entries of. Defaults to the active worker's store.
    #[serde(default)]
    pub cache_name: Option<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    /// All store names, oldest first.
    pub stores: Vec<String>,
    /// Store the entries belong to, if any.
    pub cache_name: Option<String>,
    pub entries: Vec<EntrySummary>,
}

/// Implementation of the cache_keys tool.
///
/// `current` is the store the active worker reads from.
pub async fn keys_impl(
    storage: &CacheDb, current: Option<String>, params: CacheKeysParams,
) -> Result<CallToolResult, McpError> {
    let stores = storage.keys().await?;
    let cache_name = params.cache_name.or(current);

    let entries = match &cache_name {
        Some(name) => storage.entries(name).await?,
        None => Vec::new(),
    };

    let output = CacheKeysOutput { stores, cache_name, entries };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::result_json;
    use swcache_core::Request;
    use swcache_core::model::{HeaderMap, StatusCode};
    use swcache_core::{Response, ResponseKind};

    async fn put(storage: &CacheDb, cache_name: &str, url: &str) {
        let request = Request::parse_get(url).unwrap();
        let response = Response::new(
            StatusCode::OK,
            ResponseKind::Basic,
            request.url.clone(),
            HeaderMap::new(),
            bytes::Bytes::from_static(b"body"),
        );
        storage.put(cache_name, &request, response).await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_lists_current_store() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        put(&storage, "swcache-1", "https://example.com/web/assets/a.js").await;
        put(&storage, "swcache-1", "https://example.com/web/assets/b.js").await;
        put(&storage, "swcache-0", "https://example.com/web/assets/a.js").await;

        let output = result_json(&keys_impl(&storage, Some("swcache-1".into()), CacheKeysParams::default()).await.unwrap());
        let mut stores: Vec<&str> = output["stores"].as_array().unwrap().iter().filter_map(|v| v.as_str()).collect();
        stores.sort();
        assert_eq!(stores, vec!["swcache-0", "swcache-1"]);
        assert_eq!(output["cache_name"], "swcache-1");
        assert_eq!(output["entries"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_keys_named_store() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        put(&storage, "swcache-0", "https://example.com/web/assets/a.js").await;

        let params = CacheKeysParams { cache_name: Some("swcache-0".into()) };
        let output = result_json(&keys_impl(&storage, Some("swcache-1".into()), params).await.unwrap());
        assert_eq!(output["cache_name"], "swcache-0");
        assert_eq!(output["entries"][0]["url"], "https://example.com/web/assets/a.js");
        assert_eq!(output["entries"][0]["size"], 4);
    }

    #[tokio::test]
    async fn test_keys_empty() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        let output = result_json(&keys_impl(&storage, None, CacheKeysParams::default()).await.unwrap());
        assert_eq!(output["stores"], serde_json::json!([]));
        assert!(output["cache_name"].is_null());
        assert_eq!(output["entries"], serde_json::json!([]));
    }
}
