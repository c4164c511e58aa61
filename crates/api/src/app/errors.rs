use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use piggybank_core::DomainError;

use crate::app::services::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ServiceError::Domain(DomainError::InvalidId(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_id", msg)
        }
        ServiceError::Domain(DomainError::InvariantViolation(msg)) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        ServiceError::Domain(DomainError::NotFound) | ServiceError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "not found")
        }
        ServiceError::Domain(DomainError::Conflict(msg)) | ServiceError::Conflict(msg) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        // Fatal downstream failures surface as plain 500s: no retry, no
        // compensation, the caller decides what to do next.
        ServiceError::Downstream(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "downstream_unavailable", msg)
        }
        ServiceError::Internal(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
