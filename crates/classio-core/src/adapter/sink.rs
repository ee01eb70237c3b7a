//! Response sink handed to middleware handlers.
//!
//! The sink accumulates status, headers and body chunks until a terminal
//! operation (`send`, `json`, `redirect`, `end`, or `Next::run`) moves it
//! from [`SinkState::Open`] to [`SinkState::Ended`]. That transition happens
//! once and fires the completion signal once; every mutation after it is a
//! silent no-op.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use serde_json::Value;
use tokio::sync::watch;

use crate::domain::{Headers, JSON_CONTENT_TYPE, NormalizedResponse, TEXT_CONTENT_TYPE};

/// Default content type for text passed to [`ResponseSink::send`].
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Default content type for raw bytes passed to [`ResponseSink::send`].
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Lifecycle of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Open,
    Ended,
}

/// Anything [`ResponseSink::send`] accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured payload, serialized as JSON.
    Json(Value),
    Text(String),
    Bytes(Bytes),
}

/// Objects and arrays are structured; scalars and null are sent as text.
impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(_) | Value::Array(_) => Self::Json(value),
            Value::String(text) => Self::Text(text),
            scalar => Self::Text(scalar.to_string()),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

struct SinkInner {
    status: u16,
    headers: Headers,
    chunks: Vec<Bytes>,
    state: SinkState,
}

impl SinkInner {
    const fn is_open(&self) -> bool {
        matches!(self.state, SinkState::Open)
    }

    fn set_default_content_type(&mut self, value: &str) {
        if !self.headers.contains("content-type") {
            self.headers.insert("content-type", value);
        }
    }
}

struct Shared {
    inner: Mutex<SinkInner>,
    completed: watch::Sender<bool>,
}

/// Mutable response builder shared between a middleware handler and the
/// adapter waiting on it. Cloning yields another handle to the same sink.
#[derive(Clone)]
pub struct ResponseSink {
    shared: Arc<Shared>,
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink {
    pub fn new() -> Self {
        let (completed, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(SinkInner {
                    status: 200,
                    headers: Headers::new(),
                    chunks: Vec::new(),
                    state: SinkState::Open,
                }),
                completed,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` only while the sink is open.
    fn mutate(&self, f: impl FnOnce(&mut SinkInner)) -> &Self {
        let mut inner = self.lock();
        if inner.is_open() {
            f(&mut *inner);
        }
        self
    }

    /// Apply `f` and end the sink, if it is still open.
    fn finish(&self, f: impl FnOnce(&mut SinkInner)) -> &Self {
        let mut inner = self.lock();
        if inner.is_open() {
            f(&mut *inner);
            inner.state = SinkState::Ended;
            drop(inner);
            self.shared.completed.send_replace(true);
        }
        self
    }

    pub fn status(&self, code: u16) -> &Self {
        self.mutate(|inner| inner.status = code)
    }

    /// Set a header, replacing any previous value.
    pub fn set(&self, field: &str, value: impl Into<String>) -> &Self {
        let value = value.into();
        self.mutate(|inner| inner.headers.insert(field, value))
    }

    /// Alias for [`ResponseSink::set`].
    pub fn header(&self, field: &str, value: impl Into<String>) -> &Self {
        self.set(field, value)
    }

    /// Set the content type. `html`, `json` and `text` are accepted as
    /// shorthands; anything else is used verbatim.
    pub fn content_type(&self, kind: &str) -> &Self {
        let value = match kind {
            "html" => HTML_CONTENT_TYPE,
            "json" => JSON_CONTENT_TYPE,
            "text" => TEXT_CONTENT_TYPE,
            other => other,
        };
        self.set("content-type", value)
    }

    /// Read a header, ignoring case.
    pub fn get(&self, field: &str) -> Option<String> {
        self.lock().headers.get(field).map(str::to_string)
    }

    /// Serialize `value` as the body and end.
    pub fn json(&self, value: &Value) -> &Self {
        let body = Bytes::from(value.to_string());
        self.finish(|inner| {
            inner.headers.insert("content-type", JSON_CONTENT_TYPE);
            inner.chunks.push(body);
        })
    }

    /// Append `payload` and end.
    pub fn send(&self, payload: impl Into<Payload>) -> &Self {
        match payload.into() {
            Payload::Json(value) => self.json(&value),
            Payload::Text(text) => self.finish(|inner| {
                inner.set_default_content_type(HTML_CONTENT_TYPE);
                inner.chunks.push(Bytes::from(text));
            }),
            Payload::Bytes(bytes) => self.finish(|inner| {
                inner.set_default_content_type(OCTET_STREAM_CONTENT_TYPE);
                inner.chunks.push(bytes);
            }),
        }
    }

    /// Redirect with `302 Found`.
    pub fn redirect(&self, url: &str) -> &Self {
        self.redirect_with(302, url)
    }

    pub fn redirect_with(&self, status: u16, url: &str) -> &Self {
        self.finish(|inner| {
            inner.status = status;
            inner.headers.insert("location", url);
        })
    }

    /// Append a body chunk. Returns `false` once the sink has ended.
    pub fn write(&self, chunk: impl Into<Bytes>) -> bool {
        let chunk = chunk.into();
        let mut inner = self.lock();
        if !inner.is_open() {
            return false;
        }
        inner.chunks.push(chunk);
        true
    }

    pub fn end(&self) -> &Self {
        self.finish(|_| {})
    }

    /// Append a final chunk and end.
    pub fn end_with(&self, chunk: impl Into<Bytes>) -> &Self {
        let chunk = chunk.into();
        self.finish(|inner| inner.chunks.push(chunk))
    }

    pub fn state(&self) -> SinkState {
        self.lock().state
    }

    pub fn is_ended(&self) -> bool {
        self.state() == SinkState::Ended
    }

    pub fn status_code(&self) -> u16 {
        self.lock().status
    }

    /// Resolves once the sink has ended.
    pub async fn completed(&self) {
        let mut rx = self.shared.completed.subscribe();
        // The sender lives as long as `self`, so this only fails if the sink is gone.
        let _ = rx.wait_for(|ended| *ended).await;
    }

    /// End the sink without touching its contents.
    pub(crate) fn force_end(&self) {
        self.finish(|_| {});
    }

    /// Snapshot of the sink as a response: chunks concatenated in call order.
    pub fn to_response(&self) -> NormalizedResponse {
        let inner = self.lock();
        let mut body = BytesMut::with_capacity(inner.chunks.iter().map(Bytes::len).sum());
        for chunk in &inner.chunks {
            body.extend_from_slice(chunk);
        }
        NormalizedResponse {
            status: inner.status,
            headers: inner.headers.clone(),
            body: body.freeze(),
        }
    }
}

impl fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ResponseSink")
            .field("status", &inner.status)
            .field("headers", &inner.headers)
            .field("chunks", &inner.chunks.len())
            .field("state", &inner.state)
            .finish()
    }
}

/// Continuation passed to middleware handlers.
///
/// Running it means "nothing here handled the request": the sink gets a
/// `404 Not Found` unless it has already ended.
#[derive(Debug, Clone)]
pub struct Next {
    sink: ResponseSink,
}

impl Next {
    pub const fn new(sink: ResponseSink) -> Self {
        Self { sink }
    }

    pub fn run(&self) {
        self.sink.finish(|inner| {
            inner.status = 404;
            inner.set_default_content_type(HTML_CONTENT_TYPE);
            inner.chunks.push(Bytes::from_static(b"Not Found"));
        });
    }
}
