use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use kitchenflow_core::DomainError;
use kitchenflow_sync::{FetchError, SyncError};

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::IllegalTransition(msg) => {
            json_error(StatusCode::CONFLICT, "illegal_transition", msg)
        }
        DomainError::Precondition(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "precondition_failed", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn fetch_error_to_response(err: FetchError) -> axum::response::Response {
    match err {
        FetchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        FetchError::Timeout => json_error(StatusCode::GATEWAY_TIMEOUT, "upstream_timeout", err.to_string()),
        other => json_error(StatusCode::BAD_GATEWAY, "upstream_error", other.to_string()),
    }
}

pub fn sync_error_to_response(err: SyncError) -> axum::response::Response {
    match err {
        SyncError::Domain(e) => domain_error_to_response(e),
        SyncError::Fetch(e) => fetch_error_to_response(e),
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
