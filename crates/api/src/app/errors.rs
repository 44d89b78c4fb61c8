use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use discoverly_infra::{ErrorKind, ServiceError};

/// Handler error: a [`ServiceError`] rendered as `{"error", "message"}`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<discoverly_core::DomainError> for ApiError {
    fn from(err: discoverly_core::DomainError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        service_error_to_response(self.0)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Validation | ErrorKind::NoOp => StatusCode::BAD_REQUEST,
        ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn service_error_to_response(err: ServiceError) -> Response {
    let kind = err.kind();
    match kind {
        ErrorKind::Fatal => tracing::error!(error = %err, "request failed"),
        ErrorKind::Transient => tracing::warn!(error = %err, "request failed transiently"),
        _ => tracing::debug!(error = %err, "request rejected"),
    }
    json_error(status_for(kind), err.code(), err.public_message())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
