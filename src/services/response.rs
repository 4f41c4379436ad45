//! HTTP response building helpers
//!
//! Every body is JSON. Errors use `{"error": message}`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::error::IntakeError;

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

/// Build a JSON response with 201 Created status
pub fn created<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::CREATED, body)
}

/// Build a 404 Not Found response with message
pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    json_response(StatusCode::NOT_FOUND, &serde_json::json!({ "error": message }))
}

/// Build a 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed" }),
    )
}

/// Build a 500 Internal Server Error response with message
pub fn internal_error(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &serde_json::json!({ "error": message }),
    )
}

/// HTTP status for an error
pub fn status_for(error: &IntakeError) -> StatusCode {
    match error {
        IntakeError::Unauthenticated => StatusCode::UNAUTHORIZED,
        IntakeError::Forbidden(_) => StatusCode::FORBIDDEN,
        IntakeError::Validation { .. } | IntakeError::NoOp(_) | IntakeError::Json(_) => {
            StatusCode::BAD_REQUEST
        }
        IntakeError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert an IntakeError to an HTTP response.
///
/// Caller-facing errors keep their message. Everything else is logged and
/// answered with `failure_message`.
pub fn error_response(error: IntakeError, failure_message: &str) -> Response<Full<Bytes>> {
    let status = status_for(&error);
    if status.is_server_error() {
        error!(error = %error, "{}", failure_message);
        return internal_error(failure_message);
    }

    let message = match &error {
        IntakeError::Json(e) => format!("Invalid JSON body: {}", e),
        _ => error.to_string(),
    };
    json_response(status, &serde_json::json!({ "error": message }))
}
