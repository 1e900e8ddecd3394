//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use bigdrop_core::error::{AppError, ErrorKind};
use bigdrop_core::types::response::{ApiErrorBody, ApiErrorResponse};

/// An [`AppError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Validation | ErrorKind::InvalidSize => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidState
        | ErrorKind::IncompleteUpload
        | ErrorKind::AlreadyAssembling
        | ErrorKind::NotReady => StatusCode::CONFLICT,
        ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::OutOfRange | ErrorKind::SizeMismatch | ErrorKind::InvalidArchive => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Database
        | ErrorKind::Configuration
        | ErrorKind::Serialization
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(err.kind);

        let (message, details) = match err.kind {
            ErrorKind::Storage => {
                tracing::warn!(error = ?err, "Storage error");
                ("Storage is temporarily unavailable, retry the request".to_string(), None)
            }
            _ if status.is_server_error() => {
                tracing::error!(error = ?err, "Internal server error");
                ("An internal error occurred".to_string(), None)
            }
            _ => {
                tracing::debug!(kind = err.kind.code(), message = %err.message, "Request failed");
                (err.message, err.details)
            }
        };

        let body = ApiErrorResponse {
            error: ApiErrorBody {
                kind: err.kind.code().to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}
