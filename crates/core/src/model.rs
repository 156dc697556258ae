//! Request and response model shared by the worker, the store and the network.
//!
//! A [`Response`] body is a single-consumption value: the type is deliberately
//! not `Clone`, and a second copy can only be made through
//! [`Response::duplicate`]. The worker duplicates before handing one copy to
//! the store and returning the other to the caller.

use bytes::Bytes;
use http::header;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// An intercepted network request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    /// Build a request, dropping the URL fragment the way fetch does.
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url, headers: HeaderMap::new() }
    }

    /// Shorthand for a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse `input` and build a GET request from it.
    pub fn parse_get(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::get(url))
    }

    /// Build a request from a method name such as `"post"` or `"GET"`.
    pub fn with_method(method: &str, url: Url) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {method:?}")))?;
        Ok(Self::new(method, url))
    }

    /// Whether the URL uses a websocket scheme.
    pub fn is_websocket(&self) -> bool {
        matches!(self.url.scheme(), "ws" | "wss")
    }
}

/// Response type as exposed by fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response; the only kind the cache stores.
    Basic,
    /// Cross-origin response obtained with CORS.
    Cors,
    /// Cross-origin response without CORS; status and body are hidden.
    Opaque,
    /// Manual-redirect response.
    OpaqueRedirect,
    /// Network error placeholder.
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::OpaqueRedirect => "opaqueredirect",
            ResponseKind::Error => "error",
        }
    }
}

/// A response snapshot.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub kind: ResponseKind,
    pub url: Url,
    pub headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, kind: ResponseKind, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        Self { status, kind, url, headers, body }
    }

    /// Create an independent copy for a second consumer.
    pub fn duplicate(&self) -> Self {
        Self {
            status: self.status,
            kind: self.kind,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Borrow the body without consuming the response.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the response and take its body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Declared `Content-Length`, read the way `parseInt(value, 10)` would.
    ///
    /// Leading whitespace is skipped and only the leading decimal digits are
    /// parsed; a missing or non-numeric header yields `None`. Digit runs too
    /// long for a `u64` saturate to `u64::MAX`.
    pub fn declared_length(&self) -> Option<u64> {
        let value = self.headers.get(header::CONTENT_LENGTH)?.to_str().ok()?;
        value
            .trim_start()
            .bytes()
            .take_while(u8::is_ascii_digit)
            .fold(None, |length: Option<u64>, digit| {
                Some(length.unwrap_or(0).saturating_mul(10).saturating_add(u64::from(digit - b'0')))
            })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_length(value: &str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_str(value).unwrap());
        Response::new(
            StatusCode::OK,
            ResponseKind::Basic,
            Url::parse("https://example.com/web/assets/app.js").unwrap(),
            headers,
            Bytes::from_static(b"console.log(1)"),
        )
    }

    #[test]
    fn test_request_drops_fragment() {
        let request = Request::parse_get("https://example.com/web/assets/app.js#L10").unwrap();
        assert_eq!(request.url.as_str(), "https://example.com/web/assets/app.js");
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_request_with_method() {
        let url = Url::parse("https://example.com/web/assets/app.js").unwrap();
        assert_eq!(Request::with_method("post", url.clone()).unwrap().method, Method::POST);
        assert!(Request::with_method("", url.clone()).is_err());
        assert!(Request::with_method("GE T", url).is_err());
    }

    #[test]
    fn test_request_websocket_scheme() {
        assert!(Request::parse_get("wss://example.com/websocket").unwrap().is_websocket());
        assert!(!Request::parse_get("https://example.com/websocket").unwrap().is_websocket());
    }

    #[test]
    fn test_parse_get_invalid() {
        assert!(matches!(Request::parse_get("not a url"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_declared_length() {
        assert_eq!(response_with_length("2000000").declared_length(), Some(2_000_000));
        assert_eq!(response_with_length(" 42").declared_length(), Some(42));
        assert_eq!(response_with_length("12abc").declared_length(), Some(12));
        assert_eq!(response_with_length("abc").declared_length(), None);
        assert_eq!(response_with_length("99999999999999999999999").declared_length(), Some(u64::MAX));
    }

    #[test]
    fn test_declared_length_missing() {
        let response = Response::new(
            StatusCode::OK,
            ResponseKind::Basic,
            Url::parse("https://example.com/").unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        );
        assert_eq!(response.declared_length(), None);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let original = response_with_length("14");
        let copy = original.duplicate();
        assert_eq!(copy.body(), original.body());
        assert_eq!(copy.status, original.status);
        assert_eq!(original.into_body(), copy.into_body());
    }

    #[test]
    fn test_response_kind_serde() {
        let json = serde_json::to_string(&ResponseKind::OpaqueRedirect).unwrap();
        assert_eq!(json, "\"opaqueredirect\"");
        assert_eq!(ResponseKind::Basic.as_str(), "basic");
    }
}
