//! Network layer the worker and the host fetch through.
//!
//! ### Response kinds
//! - Request and final URL (after redirects) on the page origin → `basic`
//! - Anything else → `cors`
//!
//! Without a configured page origin the request's own origin stands in.
//!
//! ### Limits
//! - Max redirects: 5
//! - Timeout: configurable (default 20s); the worker adds none of its own
//!
//! The [`Network`] trait is the seam tests replace with an in-memory fake.

pub mod url;

use async_trait::async_trait;
use ::url::Url;
use reqwest::Client;
use std::time::{Duration, Instant};
use swcache_core::{Request, Response, ResponseKind};

pub use self::url::{UrlError, resolve, same_origin, script_directory, within_scope};

/// Error type for network failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Failed(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

impl From<NetworkError> for swcache_core::Error {
    fn from(err: NetworkError) -> Self {
        swcache_core::Error::Network(err.to_string())
    }
}

/// Anything that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: Request) -> Result<Response, NetworkError>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin of the pages issuing requests. Decides `basic` vs `cors`.
    pub origin: Option<Url>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { user_agent: "swcache/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5, origin: None }
    }
}

/// reqwest-backed network.
pub struct HttpNetwork {
    http: Client,
    config: NetworkConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: NetworkConfig) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| NetworkError::Failed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Response kind for a request that ended up at `final_url`.
    pub fn classify(&self, requested: &Url, final_url: &Url) -> ResponseKind {
        let page = self.config.origin.as_ref().unwrap_or(requested);
        if same_origin(page, requested) && same_origin(page, final_url) {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: Request) -> Result<Response, NetworkError> {
        let start = Instant::now();

        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(NetworkError::UnsupportedScheme(request.url.scheme().to_string()));
        }

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout(request.url.to_string())
                } else {
                    NetworkError::Failed(e.to_string())
                }
            })?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let kind = self.classify(&request.url, &final_url);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Failed(format!("failed to read response: {}", e)))?;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response::new(status, kind, final_url, headers, bytes))
    }
}
