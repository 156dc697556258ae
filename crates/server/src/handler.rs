//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::site::Site;
use crate::tools::asset::{AssetFetchParams, fetch_impl};
use crate::tools::cache::{CacheKeysParams, keys_impl};
use crate::tools::worker::{
    WorkerScriptParams, WorkerStatusParams, WorkerUpdateParams, script_impl, status_impl, update_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwcacheServer {
    site: Site,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwcacheServer {
    /// Create a new server handler over a loaded site.
    pub fn new(site: Site) -> Self {
        Self { site, tool_router: Self::tool_router() }
    }

    /// Render the worker script and the headers it is served with.
    #[tool(description = "Render the worker script with its build-time constants and response headers.")]
    async fn worker_script(&self, params: Parameters<WorkerScriptParams>) -> Result<CallToolResult, McpError> {
        script_impl(&self.site, params.0).await
    }

    /// Report registration, worker states and controlled pages.
    #[tool(description = "Show the worker registration, worker lifecycle states, cache name and size ceiling.")]
    async fn worker_status(&self, params: Parameters<WorkerStatusParams>) -> Result<CallToolResult, McpError> {
        status_impl(&self.site, params.0).await
    }

    /// Deploy new constants and run the update check.
    ///
    /// A new version token installs a new worker whose activation deletes
    /// every older store.
    #[tool(
        description = "Deploy a new cache version and/or size ceiling and run the worker update. Old cache versions are deleted on activation."
    )]
    async fn worker_update(&self, params: Parameters<WorkerUpdateParams>) -> Result<CallToolResult, McpError> {
        update_impl(&self.site, params.0).await
    }

    /// Fetch a URL from the server's page through the worker.
    #[tool(
        description = "Request a URL or path from the page, through the worker. Reports status and whether it came from cache, network or passthrough."
    )]
    async fn asset_fetch(&self, params: Parameters<AssetFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.site, params.0).await
    }

    /// List cache stores and the entries of one store.
    #[tool(description = "List cache store names and the entries of a store (default: the active worker's store).")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        let current = self
            .site
            .host()
            .active_worker()
            .await
            .map(|worker| worker.cache_name().to_string());
        keys_impl(self.site.host().storage(), current, params.0).await
    }
}

impl SwcacheServer {
    pub fn site(&self) -> &Site {
        &self.site
    }
}

impl ServerHandler for SwcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubNetwork, test_config};
    use swcache_core::CacheDb;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        let site = Site::with_network(test_config(), storage, StubNetwork::new()).await.unwrap();
        let server = SwcacheServer::new(site);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["asset_fetch", "cache_keys", "worker_script", "worker_status", "worker_update"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        let site = Site::with_network(test_config(), storage, StubNetwork::new()).await.unwrap();
        let info = SwcacheServer::new(site).get_info();
        assert_eq!(info.server_info.name, "swcache");
        assert!(info.capabilities.tools.is_some());
    }
}
