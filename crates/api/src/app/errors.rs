use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use kopontren_auth::AuthzError;
use kopontren_core::DomainError;
use kopontren_infra::services::{AuthFailure, ServiceError};

/// Message shown when a write could not be persisted. The cause only goes to the log.
pub const STORE_ERROR_MESSAGE: &str = "the operation could not be saved, please try again";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// Malformed request that never reached a service (bad query, bad multipart).
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self::Service(value.into())
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidState(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_state", msg),
        DomainError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Service(ServiceError::Domain(e)) => domain_error_to_response(e),
            ApiError::Service(ServiceError::Store(e)) => {
                tracing::error!(error = %e, "store write failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", STORE_ERROR_MESSAGE)
            }
            ApiError::Service(ServiceError::Auth(AuthFailure::InvalidCredentials)) => json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                AuthFailure::InvalidCredentials.to_string(),
            ),
            ApiError::Service(ServiceError::Auth(AuthFailure::Token(_))) => {
                json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or expired token")
            }
            ApiError::Service(ServiceError::Auth(AuthFailure::Forbidden(e))) | ApiError::Forbidden(e) => {
                json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
            }
            ApiError::Service(ServiceError::Auth(AuthFailure::Hashing(msg))) => {
                tracing::error!(error = %msg, "password hashing failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
            }
            ApiError::Service(ServiceError::Io(e)) => {
                tracing::error!(error = %e, "file storage failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "file storage failure")
            }
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kopontren_infra::store::StoreError;

    fn status(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(status(DomainError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status(DomainError::invalid_state("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status(DomainError::not_found("product")), StatusCode::NOT_FOUND);
        assert_eq!(status(DomainError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(status(AuthzError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status(ServiceError::Auth(AuthFailure::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(ServiceError::Store(StoreError::Journal("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
