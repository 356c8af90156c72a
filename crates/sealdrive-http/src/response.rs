//! JSON response construction.
//!
//! Success bodies are the serialized DTOs from `sealdrive-model`. Error
//! bodies are the field→message maps from
//! [`ServiceError::field_errors`](sealdrive_core::ServiceError::field_errors);
//! clients key off the status code, not the body.

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use sealdrive_core::ServiceError;

use crate::body::ApiResponseBody;

/// Serialize `value` as a JSON response with `status`.
pub fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> http::Response<ApiResponseBody> {
    match serde_json::to_vec(value) {
        Ok(body) => http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(ApiResponseBody::from_bytes(body))
            .unwrap_or_else(|_| fallback_response()),
        Err(e) => {
            error!(error = %e, "failed to serialize response body");
            error_to_response(&ServiceError::Internal(e.into()))
        }
    }
}

/// An empty `204 No Content` response.
#[must_use]
pub fn no_content() -> http::Response<ApiResponseBody> {
    http::Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(ApiResponseBody::empty())
        .unwrap_or_else(|_| fallback_response())
}

/// Render a [`ServiceError`] as its status code plus JSON field map.
#[must_use]
pub fn error_to_response(err: &ServiceError) -> http::Response<ApiResponseBody> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::to_vec(&err.field_errors()).unwrap_or_default();
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(ApiResponseBody::from_bytes(body))
        .unwrap_or_else(|_| fallback_response())
}

/// Last-resort response when even the builder fails.
fn fallback_response() -> http::Response<ApiResponseBody> {
    let mut response = http::Response::new(ApiResponseBody::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
