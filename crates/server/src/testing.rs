//! Shared fixtures for server tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use rmcp::model::CallToolResult;
use swcache_client::{Network, NetworkError};
use swcache_core::model::{HeaderMap, HeaderValue, StatusCode};
use swcache_core::{AppConfig, Request, Response, ResponseKind};

/// Answers every http(s) URL with a small same-origin JavaScript body and
/// counts the calls. Paths containing `/offline/` fail.
#[derive(Debug, Default)]
pub struct StubNetwork {
    calls: AtomicUsize,
}

impl StubNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.url.path().contains("/offline/") {
            return Err(NetworkError::Failed(format!("connection refused: {}", request.url)));
        }

        let body = Bytes::from(format!("// {}", request.url.path()));
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/javascript"));
        headers.insert("content-length", HeaderValue::from(body.len()));
        Ok(Response::new(StatusCode::OK, ResponseKind::Basic, request.url, headers, body))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        db_path: PathBuf::from(":memory:"),
        origin: "https://example.com".into(),
        max_file_size_bytes: 1_000_000,
        ..AppConfig::default()
    }
}

/// Pull the JSON text out of a tool result.
pub fn result_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).unwrap();
    serde_json::from_str(text).unwrap()
}
