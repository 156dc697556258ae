//! Request key generation.

use sha2::{Digest, Sha256};

use crate::model::Request;

/// Compute the store key for a request: method and URL, fragment already
/// stripped by [`Request::new`].
pub fn request_key(request: &Request) -> String {
    compute_key(request.method.as_str(), request.url.as_str())
}

/// Compute a store key from its raw parts.
pub fn compute_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use url::Url;

    #[test]
    fn test_key_stability() {
        let a = compute_key("GET", "https://example.com/web/assets/app.js");
        let b = compute_key("GET", "https://example.com/web/assets/app.js");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_depends_on_method() {
        assert_ne!(compute_key("GET", "https://example.com/a"), compute_key("HEAD", "https://example.com/a"));
    }

    #[test]
    fn test_key_ignores_fragment() {
        let plain = Request::get(Url::parse("https://example.com/m/static/a.css").unwrap());
        let fragment = Request::new(Method::GET, Url::parse("https://example.com/m/static/a.css#top").unwrap());
        assert_eq!(request_key(&plain), request_key(&fragment));
    }

    #[test]
    fn test_key_keeps_query() {
        let a = Request::get(Url::parse("https://example.com/m/static/a.css?v=1").unwrap());
        let b = Request::get(Url::parse("https://example.com/m/static/a.css?v=2").unwrap());
        assert_ne!(request_key(&a), request_key(&b));
    }

    #[test]
    fn test_key_format() {
        let key = compute_key("GET", "https://example.com");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
