//! Tenant dispatch: everything that is not a control request.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use classio_core::NormalizedResponse;
use tracing::debug;

use crate::error::HttpError;
use crate::state::AppState;

/// Buffer the request, run the tenant and relay its response.
pub async fn dispatch(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, HttpError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|_| HttpError::PayloadTooLarge)?;

    let response = state
        .dispatcher
        .dispatch(Request::from_parts(parts, body))
        .await?;

    Ok(into_http_response(response))
}

/// Convert a tenant response. Headers that are not valid HTTP are dropped.
pub fn into_http_response(normalized: NormalizedResponse) -> Response {
    let mut response = Response::new(Body::from(normalized.body));
    *response.status_mut() =
        StatusCode::from_u16(normalized.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let headers = response.headers_mut();
    for (name, value) in normalized.headers.iter() {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => debug!(header = name, "dropping invalid tenant response header"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_status_headers_and_body() {
        let normalized = NormalizedResponse::text("hi")
            .with_status(201)
            .with_header("x-id", "7")
            .with_header("bad header", "x");

        let response = into_http_response(normalized);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-id"], "7");
        assert_eq!(response.headers().len(), 2);
    }

    #[test]
    fn invalid_status_becomes_500() {
        let response = into_http_response(NormalizedResponse::new(42));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
