//! Deadline-bounded invocation of both handler conventions.
//!
//! Each invocation runs on its own task. When the deadline elapses first the
//! task is aborted, which drops everything the handler holds (child processes
//! included), and the caller gets [`GatewayError::Timeout`].

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{error, warn};

use super::sink::{Next, ResponseSink};
use crate::domain::{
    DirectHandler, HandlerError, MiddlewareHandler, NormalizedRequest, NormalizedResponse,
};
use crate::error::GatewayError;

/// Invoke a direct handler and validate what it returns.
pub async fn invoke_direct(
    handler: Arc<dyn DirectHandler>,
    request: NormalizedRequest,
    deadline: Duration,
) -> Result<NormalizedResponse, GatewayError> {
    let mut task = tokio::spawn(async move { handler.call(request).await });

    match timeout(deadline, &mut task).await {
        Err(_) => {
            task.abort();
            Err(GatewayError::Timeout)
        }
        Ok(Err(join_error)) => Err(join_failure(join_error)),
        Ok(Ok(Err(handler_error))) => Err(handler_error.into()),
        Ok(Ok(Ok(response))) if !response.is_well_formed() => {
            warn!(status = response.status, "direct handler returned an invalid status");
            Err(HandlerError::MalformedResponse.into())
        }
        Ok(Ok(Ok(response))) => Ok(response),
    }
}

/// Invoke a middleware handler and wait for its sink to complete.
///
/// The handler returning `Ok(())` does not finish the invocation; only the
/// sink ending does. An error returned before completion fails it.
pub async fn invoke_middleware(
    handler: Arc<dyn MiddlewareHandler>,
    request: NormalizedRequest,
    deadline: Duration,
) -> Result<NormalizedResponse, GatewayError> {
    let sink = ResponseSink::new();
    let next = Next::new(sink.clone());

    let mut task = {
        let sink = sink.clone();
        tokio::spawn(async move { handler.handle(request, sink, next).await })
    };

    let outcome = timeout(deadline, async {
        let mut handler_done = false;
        loop {
            tokio::select! {
                biased;

                () = sink.completed() => return Ok(()),

                joined = &mut task, if !handler_done => {
                    handler_done = true;
                    match joined {
                        Ok(Ok(())) => {}
                        Ok(Err(handler_error)) => return Err(GatewayError::from(handler_error)),
                        Err(join_error) => return Err(join_failure(join_error)),
                    }
                }
            }
        }
    })
    .await;

    // The response is decided; anything the handler left running goes away.
    task.abort();

    match outcome {
        Ok(Ok(())) => Ok(sink.to_response()),
        Ok(Err(err)) => {
            sink.force_end();
            Err(err)
        }
        Err(_) => {
            sink.force_end();
            Err(GatewayError::Timeout)
        }
    }
}

fn join_failure(join_error: JoinError) -> GatewayError {
    if join_error.is_panic() {
        let message = panic_message(join_error.into_panic());
        error!(panic = %message, "tenant handler panicked");
        GatewayError::execution("handler panicked")
    } else {
        GatewayError::execution("handler cancelled")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
