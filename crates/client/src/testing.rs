//! In-memory network and log capture for worker and host tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use swcache_core::{Request, Response, ResponseKind};
use url::Url;

use crate::fetch::{Network, NetworkError};

/// Canned reply for one URL.
#[derive(Debug, Clone)]
pub struct FakeReply {
    status: u16,
    kind: ResponseKind,
    headers: Vec<(String, String)>,
    body: &'static [u8],
    auto_length: bool,
}

/// A 200 `basic` JavaScript response with a matching Content-Length.
pub fn ok_asset(body: &'static [u8]) -> FakeReply {
    FakeReply {
        status: 200,
        kind: ResponseKind::Basic,
        headers: vec![("content-type".into(), "text/javascript".into())],
        body,
        auto_length: true,
    }
}

impl FakeReply {
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case("content-length") {
            self.auto_length = false;
        }
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Drop the Content-Length header, as a chunked response would.
    pub fn without_length(mut self) -> Self {
        self.auto_length = false;
        self
    }

    pub fn into_response(self, url: &Url) -> Response {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        if self.auto_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        }

        Response::new(
            StatusCode::from_u16(self.status).unwrap(),
            self.kind,
            url.clone(),
            headers,
            Bytes::from_static(self.body),
        )
    }
}

/// Network that answers from a URL table and counts every call.
///
/// URLs without a reply fail like a refused connection.
#[derive(Debug, Default)]
pub struct FakeNetwork {
    replies: Mutex<HashMap<String, FakeReply>>,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, reply: FakeReply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().get(request.url.as_str()).cloned();
        match reply {
            Some(reply) => Ok(reply.into_response(&request.url)),
            None => Err(NetworkError::Failed(format!("connection refused: {}", request.url))),
        }
    }
}

/// Collects JSON log lines emitted while its guard is held.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl LogCapture {
    /// Route this thread's events into a fresh capture until the guard drops.
    pub fn start() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::DEBUG)
            .json()
            .finish();
        (capture, tracing::subscriber::set_default(subscriber))
    }

    /// Parsed events whose message equals `message`.
    pub fn events(&self, message: &str) -> Vec<serde_json::Value> {
        let raw = String::from_utf8(self.buf.lock().unwrap().clone()).unwrap();
        raw.lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter(|event| event["fields"]["message"] == message)
            .collect()
    }
}
