//! Capability adapter: request translation, the response sink and the
//! deadline-bounded invocation of both handler conventions.

mod invoke;
mod sink;
mod translate;

pub use invoke::{invoke_direct, invoke_middleware};
pub use sink::{
    HTML_CONTENT_TYPE, Next, OCTET_STREAM_CONTENT_TYPE, Payload, ResponseSink, SinkState,
};
pub use translate::{request_host, translate_request};
