//! Response envelope shared by every endpoint.

use serde::{Deserialize, Serialize};

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Failure envelope: `{"error": {"kind", "message", "details"?}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error body.
    pub error: ApiErrorBody,
}

/// Machine-readable kind plus human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Stable error code, e.g. `INCOMPLETE_UPLOAD`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
