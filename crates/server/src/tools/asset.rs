//! asset_fetch tool implementation.
//!
//! Issues a request from the server's page, so it goes through the
//! controlling worker exactly like a browser subresource load would.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::fetch::resolve;
use swcache_client::{ResponseSource, Route};
use swcache_core::{Error, Request};

use crate::error::ToolError;
use crate::site::Site;

/// Parameters for the asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchParams {
    /// Absolute URL, or a path resolved against the origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Include the body as text in the output (default: true).
    #[serde(default = "default_true")]
    pub include_body: bool,
}

fn default_method() -> String {
    "GET".into()
}

fn default_true() -> bool {
    true
}

/// Output from the asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchOutput {
    pub url: String,
    pub method: String,
    pub status: u16,
    /// Response type: basic, cors, opaque, ...
    pub kind: String,
    /// cache, network, passthrough or uncontrolled.
    pub source: String,
    /// Storage decision for network responses the worker handled.
    pub admission: Option<String>,
    /// Why the worker declined the request.
    pub pass_reason: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body_bytes: usize,
    pub body: Option<String>,
}

/// Implementation of the asset_fetch tool.
pub async fn fetch_impl(site: &Site, params: AssetFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(site.host().origin(), &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::with_method(&params.method, url)?;
    let method = request.method.to_string();

    let (response, route) = site.host().fetch(site.page(), request).await.map_err(ToolError::from)?;

    let (source, admission, pass_reason) = match route {
        Route::Worker(ResponseSource::Cache) => ("cache", None, None),
        Route::Worker(ResponseSource::Network(admission)) => ("network", Some(admission.as_str().to_string()), None),
        Route::Passthrough(reason) => ("passthrough", None, Some(reason.as_str().to_string())),
        Route::Uncontrolled => ("uncontrolled", None, None),
    };

    let output = AssetFetchOutput {
        url: response.url.to_string(),
        method,
        status: response.status.as_u16(),
        kind: response.kind.as_str().to_string(),
        source: source.to_string(),
        admission,
        pass_reason,
        content_type: response.content_type().map(str::to_string),
        content_length: response.declared_length(),
        body_bytes: response.body().len(),
        body: params
            .include_body
            .then(|| String::from_utf8_lossy(response.body()).into_owned()),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
