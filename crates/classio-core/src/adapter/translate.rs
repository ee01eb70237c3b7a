//! Inbound HTTP request to [`NormalizedRequest`].
//!
//! Translation never fails: anything that cannot be decoded degrades to an
//! empty or absent value.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE, HOST};
use http::{HeaderMap, Method, Request};
use url::form_urlencoded;

use crate::domain::{Headers, NormalizedRequest, RequestBody};

/// Header set by TLS-terminating proxies in front of the gateway.
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Host the request was addressed to: the `Host` header, falling back to the
/// URI authority (HTTP/2).
pub fn request_host<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().authority().map(http::uri::Authority::as_str))
}

/// Convert an inbound request into the shape tenant handlers consume.
pub fn translate_request(request: Request<Bytes>) -> NormalizedRequest {
    let host = request_host(&request).unwrap_or_default().to_string();
    let (parts, body) = request.into_parts();

    let url = parts
        .uri
        .path_and_query()
        .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());
    let path = parts.uri.path().to_string();
    let query = parse_query(parts.uri.query().unwrap_or_default());
    let headers = collect_headers(&parts.headers);
    let cookies = headers.get(COOKIE.as_str()).map(parse_cookies).unwrap_or_default();
    let body = decode_body(&parts.method, headers.get(CONTENT_TYPE.as_str()), &body);

    let protocol = headers
        .get(FORWARDED_PROTO)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| parts.uri.scheme_str())
        .unwrap_or("http")
        .to_ascii_lowercase();

    NormalizedRequest {
        method: parts.method,
        url,
        path,
        query,
        params: BTreeMap::new(),
        headers,
        cookies,
        body,
        hostname: strip_port(&host).to_string(),
        protocol,
    }
}

/// Lower-cased header map; repeated headers are joined with `", "`.
/// Values that are not valid visible ASCII are dropped.
fn collect_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        if let Ok(value) = value.to_str() {
            headers.append(name.as_str(), value);
        }
    }
    headers
}

/// Query string to map; the last value wins for repeated keys.
fn parse_query(query: &str) -> BTreeMap<String, String> {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// `name=value; other=value` pairs. The first `=` splits name from value, a
/// bare name has an empty value and the last occurrence of a name wins.
/// Values are kept verbatim, quotes included.
fn parse_cookies(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for pair in header.split(';') {
        let pair = pair.trim();
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        if name.is_empty() {
            continue;
        }
        cookies.insert(name.to_string(), value.to_string());
    }
    cookies
}

/// Decode by content type, matched case-insensitively by substring.
/// An empty body decodes to an empty form or empty text; empty JSON is
/// malformed and degrades to [`RequestBody::Empty`].
fn decode_body(method: &Method, content_type: Option<&str>, body: &Bytes) -> RequestBody {
    if *method == Method::GET || *method == Method::HEAD {
        return RequestBody::Empty;
    }

    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();

    if content_type.contains("application/json") {
        serde_json::from_slice(body).map_or(RequestBody::Empty, RequestBody::Json)
    } else if content_type.contains("application/x-www-form-urlencoded") {
        RequestBody::Form(form_urlencoded::parse(body).into_owned().collect())
    } else {
        std::str::from_utf8(body)
            .map_or(RequestBody::Empty, |text| RequestBody::Text(text.to_string()))
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep through the closing bracket.
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}
