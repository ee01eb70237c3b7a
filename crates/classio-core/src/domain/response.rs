//! The normalized response produced by either handler convention.

use std::borrow::Cow;

use bytes::Bytes;
use serde_json::Value;

use super::headers::Headers;

/// Content type used for structured (JSON) bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Content type used for plain-text bodies built with [`NormalizedResponse::text`].
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Status, headers and the full body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl NormalizedResponse {
    /// An empty response with the given status.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// A 200 plain-text response.
    pub fn text(body: impl Into<String>) -> Self {
        let mut response = Self::new(200).with_body(body.into());
        response.headers.insert("content-type", TEXT_CONTENT_TYPE);
        response
    }

    /// A 200 JSON response.
    pub fn json(value: &Value) -> Self {
        let mut response = Self::new(200).with_body(value.to_string());
        response.headers.insert("content-type", JSON_CONTENT_TYPE);
        response
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Whether the status is a valid HTTP status code.
    pub const fn is_well_formed(&self) -> bool {
        self.status >= 100 && self.status <= 599
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_sets_content_type() {
        let response = NormalizedResponse::json(&serde_json::json!({"message": "ok"}));
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("Content-Type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(response.body_text(), r#"{"message":"ok"}"#);
    }

    #[test]
    fn status_range_is_checked() {
        assert!(NormalizedResponse::new(204).is_well_formed());
        assert!(!NormalizedResponse::new(0).is_well_formed());
        assert!(!NormalizedResponse::new(600).is_well_formed());
    }
}
