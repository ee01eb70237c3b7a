//! Native handlers shipped with the gateway binary.

use classio_core::{
    HandlerError, NormalizedRequest, NormalizedResponse, ResponseSink, TenantHandler,
};

use crate::app::MiddlewareApp;
use crate::native::NativeIsolate;

/// Entry of the direct handler that echoes the normalized request as JSON.
pub const ECHO_ENTRY: &str = "echo";

/// Entry of the middleware app answering `GET /` with `Hello`.
pub const HELLO_ENTRY: &str = "hello";

/// Registry pre-populated with the built-in handlers.
pub fn builtin_isolate() -> NativeIsolate {
    NativeIsolate::new()
        .with_handler(ECHO_ENTRY, echo())
        .with_handler(HELLO_ENTRY, hello())
}

fn echo() -> TenantHandler {
    TenantHandler::direct(|request: NormalizedRequest| async move {
        serde_json::to_value(&request)
            .map(|value| NormalizedResponse::json(&value))
            .map_err(|e| HandlerError::failed(e.to_string()))
    })
}

fn hello() -> TenantHandler {
    MiddlewareApp::new()
        .get("/", |_, res: ResponseSink, _| async move {
            res.send("Hello");
            Ok(())
        })
        .into_handler()
}
