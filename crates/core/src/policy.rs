//! Request interception policy.
//!
//! Decides which requests the worker takes over. Checks run in order and
//! short-circuit:
//!
//! 1. Method must be GET
//! 2. Scheme must not be `ws:` / `wss:`
//! 3. Path must not start with an excluded prefix (`/my/`, `/api/`)
//! 4. Path must contain `/web/assets/` or `/<module>/static/`

use std::sync::LazyLock;

use http::Method;
use regex::Regex;

use crate::model::Request;

/// Matches `/web/assets/` or `/<module>/static/` anywhere in the path.
static ASSET_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/web/assets/|/[a-zA-Z0-9_-]+/static/)").expect("asset path regex is valid"));

/// Prefixes reserved for authenticated pages and the versioned API.
pub const EXCLUDED_PREFIXES: &[&str] = &["/my/", "/api/"];

/// Why a request was not intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    NotGet,
    WebSocket,
    ExcludedPrefix,
    NotAsset,
}

impl PassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassReason::NotGet => "method is not GET",
            PassReason::WebSocket => "websocket scheme",
            PassReason::ExcludedPrefix => "excluded prefix",
            PassReason::NotAsset => "not an asset path",
        }
    }
}

/// Outcome of the policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    /// The worker handles the request through the cache.
    Cache,
    /// The request goes to the network untouched.
    Pass(PassReason),
}

/// Static matcher over request paths.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    excluded_prefixes: Vec<String>,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self { excluded_prefixes: EXCLUDED_PREFIXES.iter().map(|p| p.to_string()).collect() }
    }
}

impl PathPolicy {
    /// Whether the path belongs to an asset/static family.
    pub fn is_asset_path(&self, path: &str) -> bool {
        ASSET_PATH.is_match(path)
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Decide whether the worker intercepts `request`.
    pub fn evaluate(&self, request: &Request) -> Interception {
        if request.method != Method::GET {
            return Interception::Pass(PassReason::NotGet);
        }
        if request.is_websocket() {
            return Interception::Pass(PassReason::WebSocket);
        }

        let path = request.url.path();
        if self.is_excluded(path) {
            return Interception::Pass(PassReason::ExcludedPrefix);
        }
        if !self.is_asset_path(path) {
            return Interception::Pass(PassReason::NotAsset);
        }

        Interception::Cache
    }
}
