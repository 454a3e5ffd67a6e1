use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::errors::DomainError;

/// Error body: `{"error": {"kind": "...", "message": "..."}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: "validation",
            message: message.into(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let (status, kind) = match &e {
            DomainError::InvalidInput(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            DomainError::Decode(_) => (StatusCode::BAD_REQUEST, "decode"),
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::Inference(_) => (StatusCode::INTERNAL_SERVER_ERROR, "inference"),
            DomainError::OperationFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        Self { status, kind, message: e.to_string() }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(e: MultipartRejection) -> Self {
        Self::validation(format!("expected a multipart/form-data body: {}", e.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        let status = e.status();
        let (kind, message) = if status == StatusCode::PAYLOAD_TOO_LARGE {
            ("payload_too_large", format!("upload exceeds the body size limit: {}", e.body_text()))
        } else {
            ("validation", e.body_text())
        };
        Self { status, kind, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(kind = self.kind, "{}", self.message);
        } else {
            warn!(kind = self.kind, status = %self.status, "{}", self.message);
        }
        let body = json!({ "error": { "kind": self.kind, "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}
