//! The worker script and its build-time constants.
//!
//! The hosting server renders the script with the cache name and the size
//! ceiling filled in and serves it with anti-caching headers, so that a bumped
//! version is seen on the platform's next update check. The platform compares
//! script bytes by digest: only a byte-different script installs a new worker.

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, header};
use sha2::{Digest, Sha256};

use crate::Error;
use crate::config::WorkerConfig;

/// MIME type the platform requires for worker scripts.
pub const SCRIPT_CONTENT_TYPE: &str = "application/javascript";

/// Forces revalidation of the script itself on every update check.
pub const SCRIPT_CACHE_CONTROL: &str = "no-cache, max-age=0";

/// A worker script bound to the path it is served from.
#[derive(Debug, Clone)]
pub struct WorkerScript {
    path: String,
    config: WorkerConfig,
}

/// A rendered script plus the headers it is served with.
#[derive(Debug, Clone)]
pub struct ServedScript {
    pub body: Bytes,
    pub headers: HeaderMap,
}

impl ServedScript {
    /// Hex SHA-256 of the body, used for byte-difference checks.
    pub fn digest(&self) -> String {
        script_digest(&self.body)
    }
}

impl WorkerScript {
    pub fn new(path: impl Into<String>, config: WorkerConfig) -> Self {
        Self { path: path.into(), config }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Render the script with the constants substituted.
    pub fn render(&self) -> Result<ServedScript, Error> {
        let body = serde_json::to_vec_pretty(&self.config).map_err(|e| Error::Script(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(SCRIPT_CONTENT_TYPE));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(SCRIPT_CACHE_CONTROL));

        Ok(ServedScript { body: Bytes::from(body), headers })
    }

    /// Serve the script if `path` is the path it lives at.
    ///
    /// Returns `Ok(None)` for any other path (not found).
    pub fn serve(&self, path: &str) -> Result<Option<ServedScript>, Error> {
        if path != self.path {
            return Ok(None);
        }
        self.render().map(Some)
    }

    /// Parse the constants back out of served script bytes.
    pub fn parse(bytes: &[u8]) -> Result<WorkerConfig, Error> {
        let config: WorkerConfig = serde_json::from_slice(bytes).map_err(|e| Error::Script(e.to_string()))?;

        if config.cache_name.is_empty() {
            return Err(Error::Script("cache_name must not be empty".into()));
        }
        if config.max_file_size_bytes == 0 {
            return Err(Error::Script("max_file_size_bytes must be greater than 0".into()));
        }

        Ok(config)
    }
}

/// Compute the digest the platform uses to detect a byte-different script.
pub fn script_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(version: &str) -> WorkerScript {
        WorkerScript::new(
            "/sw.js",
            WorkerConfig { cache_name: format!("swcache-{version}"), max_file_size_bytes: 1_000_000 },
        )
    }

    #[test]
    fn test_served_headers() {
        let served = script("1").serve("/sw.js").unwrap().unwrap();
        let content_type = served.headers.get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.contains("application/javascript"));

        let cache_control = served.headers.get(header::CACHE_CONTROL).unwrap().to_str().unwrap();
        assert!(cache_control.contains("no-cache"));
        assert!(cache_control.contains("max-age=0"));
    }

    #[test]
    fn test_serve_other_path_not_found() {
        assert!(script("1").serve("/other.js").unwrap().is_none());
    }

    #[test]
    fn test_render_parse_constants() {
        let served = script("7").render().unwrap();
        let config = WorkerScript::parse(&served.body).unwrap();
        assert_eq!(config.cache_name, "swcache-7");
        assert_eq!(config.max_file_size_bytes, 1_000_000);
    }

    #[test]
    fn test_digest_changes_with_version() {
        let a = script("a").render().unwrap();
        let a_again = script("a").render().unwrap();
        let b = script("b").render().unwrap();
        assert_eq!(a.digest(), a_again.digest());
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(WorkerScript::parse(b"self.addEventListener("), Err(Error::Script(_))));
        assert!(matches!(
            WorkerScript::parse(br#"{"cache_name": "", "max_file_size_bytes": 1}"#),
            Err(Error::Script(_))
        ));
    }

    #[test]
    fn test_parse_rejects_zero_ceiling() {
        let err = WorkerScript::parse(br#"{"cache_name": "swcache-1", "max_file_size_bytes": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Script(ref msg) if msg.contains("max_file_size_bytes")));
    }
}
