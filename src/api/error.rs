//! HTTP error mapping.

use crate::error::{RunError, ScanError, StorageError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors a handler can return; each maps to one status code and a JSON
/// body of the form `{"error": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ScanNotFound(id) => Self::NotFound(format!("scan not found: {}", id)),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Scan(ScanError::Validation(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Scan(ScanError::Run(RunError::ToolFailure { .. })) => StatusCode::BAD_GATEWAY,
            Self::Scan(ScanError::Run(RunError::Timeout { .. })) => StatusCode::GATEWAY_TIMEOUT,
            Self::Scan(ScanError::Run(RunError::SpawnFailure { .. })) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = match &self {
            Self::Scan(ScanError::Run(RunError::ToolFailure { exit_code, stderr })) => json!({
                "error": self.to_string(),
                "exit_code": exit_code,
                "stderr": stderr,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
