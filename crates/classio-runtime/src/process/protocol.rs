//! Wire protocol between the gateway and tenant processes.
//!
//! The request goes to the child's stdin as one JSON line. A direct tenant
//! answers with one JSON object on stdout; a middleware tenant streams sink
//! operations, one JSON object per line:
//!
//! ```text
//! {"op":"status","code":201}
//! {"op":"set","field":"x-id","value":"7"}
//! {"op":"type","value":"json"}
//! {"op":"write","chunk":"partial "}
//! {"op":"send","body":"text or any JSON value"}
//! {"op":"json","body":{"ok":true}}
//! {"op":"redirect","url":"/login","status":301}
//! {"op":"end","chunk":"optional"}
//! {"op":"next"}
//! ```
//!
//! Stdout lines that do not start with `{`, and JSON objects without an
//! `op` field (structured tenant logs), are console output.

use std::collections::BTreeMap;

use classio_core::domain::JSON_CONTENT_TYPE;
use classio_core::{HandlerError, Headers, Next, NormalizedResponse, ResponseSink};
use serde::Deserialize;
use serde_json::Value;

/// Whether a stdout line carries protocol data rather than console output.
pub fn is_protocol_line(line: &str) -> bool {
    line.starts_with('{')
}

/// Reply of a direct tenant process.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectReply {
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Value,
}

const fn default_status() -> u16 {
    200
}

/// Parse a direct tenant's stdout into a response.
///
/// The whole output may be one (possibly pretty-printed) JSON object;
/// otherwise the last protocol line is the reply and earlier lines are
/// console output.
pub fn parse_direct_reply(stdout: &str) -> Result<NormalizedResponse, HandlerError> {
    let trimmed = stdout.trim();
    let reply = serde_json::from_str::<DirectReply>(trimmed).or_else(|_| {
        trimmed
            .lines()
            .map(str::trim)
            .rfind(|line| is_protocol_line(line))
            .ok_or(HandlerError::MalformedResponse)
            .and_then(|line| {
                serde_json::from_str::<DirectReply>(line)
                    .map_err(|_| HandlerError::MalformedResponse)
            })
    })?;

    let mut headers: Headers = reply.headers.into_iter().collect();
    let body = match reply.body {
        Value::Null => Vec::new(),
        Value::String(text) => text.into_bytes(),
        structured => {
            if !headers.contains("content-type") {
                headers.insert("content-type", JSON_CONTENT_TYPE);
            }
            structured.to_string().into_bytes()
        }
    };

    Ok(NormalizedResponse {
        status: reply.status,
        headers,
        body: body.into(),
    })
}

/// One operation streamed by a middleware tenant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum SinkOp {
    Status {
        code: u16,
    },
    Set {
        field: String,
        value: String,
    },
    Type {
        value: String,
    },
    Write {
        chunk: String,
    },
    Send {
        #[serde(default)]
        body: Value,
    },
    Json {
        #[serde(default)]
        body: Value,
    },
    Redirect {
        url: String,
        #[serde(default)]
        status: Option<u16>,
    },
    End {
        #[serde(default)]
        chunk: Option<String>,
    },
    Next,
}

impl SinkOp {
    pub fn parse(line: &str) -> Result<Self, HandlerError> {
        serde_json::from_str(line)
            .map_err(|err| HandlerError::failed(format!("invalid response operation: {err}")))
    }

    /// Parse a protocol line, or `None` for a JSON object with no `op`.
    pub fn from_line(line: &str) -> Result<Option<Self>, HandlerError> {
        let value: Value = serde_json::from_str(line)
            .map_err(|err| HandlerError::failed(format!("invalid response operation: {err}")))?;
        if value.get("op").is_none() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| HandlerError::failed(format!("invalid response operation: {err}")))
    }

    /// Apply the operation to the sink. Operations after the sink has ended
    /// are ignored by the sink itself.
    pub fn apply(self, sink: &ResponseSink, next: &Next) {
        match self {
            Self::Status { code } => {
                sink.status(code);
            }
            Self::Set { field, value } => {
                sink.set(&field, value);
            }
            Self::Type { value } => {
                sink.content_type(&value);
            }
            Self::Write { chunk } => {
                sink.write(chunk);
            }
            Self::Send { body: Value::Null } => {
                sink.send(String::new());
            }
            Self::Send { body } => {
                sink.send(body);
            }
            Self::Json { body } => {
                sink.json(&body);
            }
            Self::Redirect { url, status } => {
                sink.redirect_with(status.unwrap_or(302), &url);
            }
            Self::End { chunk: Some(chunk) } => {
                sink.end_with(chunk);
            }
            Self::End { chunk: None } => {
                sink.end();
            }
            Self::Next => next.run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn direct_reply_defaults() {
        let response = parse_direct_reply(r#"{"body":"hi"}"#).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), "hi");
        assert!(response.headers.is_empty());
    }

    #[test]
    fn direct_reply_structured_body_is_json() {
        let response =
            parse_direct_reply(r#"{"status":201,"headers":{"X-Id":"7"},"body":{"message":"ok"}}"#)
                .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.headers.get("x-id"), Some("7"));
        assert_eq!(response.headers.get("content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(response.body_text(), r#"{"message":"ok"}"#);
    }

    #[test]
    fn direct_reply_skips_console_output() {
        let stdout = "starting up\n{\"body\":\"first\"}\ndebug line\n{\"body\":\"final\"}\n";
        assert_eq!(parse_direct_reply(stdout).unwrap().body_text(), "final");

        let pretty = "{\n  \"status\": 204\n}\n";
        assert_eq!(parse_direct_reply(pretty).unwrap().status, 204);
    }

    #[test]
    fn direct_reply_must_be_a_response() {
        for stdout in ["", "hello", "[1,2]", r#"{"status":"ok"}"#, r#"{"unexpected":1}"#] {
            assert_eq!(
                parse_direct_reply(stdout).unwrap_err(),
                HandlerError::MalformedResponse,
                "{stdout:?}"
            );
        }
    }

    #[test]
    fn parses_sink_ops() {
        assert_eq!(
            SinkOp::parse(r#"{"op":"status","code":201}"#).unwrap(),
            SinkOp::Status { code: 201 }
        );
        assert_eq!(SinkOp::parse(r#"{"op":"end"}"#).unwrap(), SinkOp::End { chunk: None });
        assert_eq!(SinkOp::parse(r#"{"op":"next"}"#).unwrap(), SinkOp::Next);
        assert!(SinkOp::parse(r#"{"op":"explode"}"#).is_err());
    }

    #[test]
    fn objects_without_op_are_console_output() {
        assert_eq!(SinkOp::from_line(r#"{"level":"info","msg":"hit"}"#).unwrap(), None);
        assert_eq!(
            SinkOp::from_line(r#"{"op":"next"}"#).unwrap(),
            Some(SinkOp::Next)
        );
        assert!(SinkOp::from_line(r#"{"op":"explode"}"#).is_err());
        assert!(SinkOp::from_line("{broken").is_err());
    }

    #[test]
    fn send_with_scalar_body_is_text() {
        let sink = ResponseSink::new();
        let next = Next::new(sink.clone());
        SinkOp::Send { body: json!(7) }.apply(&sink, &next);
        assert_eq!(sink.to_response().body_text(), "7");
        assert_ne!(sink.get("content-type").as_deref(), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn applies_ops_in_order() {
        let sink = ResponseSink::new();
        let next = Next::new(sink.clone());
        let ops = [
            r#"{"op":"status","code":202}"#,
            r#"{"op":"set","field":"X-Step","value":"1"}"#,
            r#"{"op":"write","chunk":"Hel"}"#,
            r#"{"op":"end","chunk":"lo"}"#,
            r#"{"op":"write","chunk":"ignored"}"#,
        ];
        for op in ops {
            SinkOp::parse(op).unwrap().apply(&sink, &next);
        }

        let response = sink.to_response();
        assert_eq!(response.status, 202);
        assert_eq!(response.headers.get("x-step"), Some("1"));
        assert_eq!(response.body_text(), "Hello");
    }

    #[test]
    fn send_with_structured_body_is_json() {
        let sink = ResponseSink::new();
        let next = Next::new(sink.clone());
        SinkOp::Send { body: json!({"ok": true}) }.apply(&sink, &next);
        assert_eq!(sink.get("content-type").as_deref(), Some(JSON_CONTENT_TYPE));
        assert_eq!(sink.to_response().body_text(), r#"{"ok":true}"#);
    }
}
