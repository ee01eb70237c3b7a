//! The normalized request both handler conventions consume.

use std::collections::BTreeMap;

use http::Method;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::headers::Headers;

/// Decoded request body.
///
/// Decoding is driven by the request's content type. Any decode failure
/// degrades to [`RequestBody::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// `application/json` payload.
    Json(Value),
    /// `application/x-www-form-urlencoded` payload.
    Form(BTreeMap<String, String>),
    /// Any other payload on a body-bearing method.
    Text(String),
    /// No body, or the body could not be decoded.
    #[default]
    Empty,
}

impl RequestBody {
    /// Returns the JSON value if the body was decoded as JSON.
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Request shape handed to tenant handlers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRequest {
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    /// Path plus query string, as received.
    pub url: String,
    pub path: String,
    /// Query parameters; the last value wins on duplicate keys.
    pub query: BTreeMap<String, String>,
    /// Route parameters, filled in by routers that match `:name` segments.
    pub params: BTreeMap<String, String>,
    pub headers: Headers,
    pub cookies: BTreeMap<String, String>,
    pub body: RequestBody,
    pub hostname: String,
    pub protocol: String,
}

impl NormalizedRequest {
    /// Look up a request header, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Alias for [`NormalizedRequest::get`].
    pub fn header(&self, name: &str) -> Option<&str> {
        self.get(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The URL as first received, before any router rewrites.
    pub fn original_url(&self) -> &str {
        &self.url
    }
}

impl Default for NormalizedRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            url: "/".to_string(),
            path: "/".to_string(),
            query: BTreeMap::new(),
            params: BTreeMap::new(),
            headers: Headers::new(),
            cookies: BTreeMap::new(),
            body: RequestBody::Empty,
            hostname: String::new(),
            protocol: "http".to_string(),
        }
    }
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}
