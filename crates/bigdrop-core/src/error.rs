//! Unified application error types for BigDrop.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Every variant of [`ErrorKind`] has a
//! stable machine-readable code that clients can match on.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested transfer or file entry was not found.
    NotFound,
    /// The bearer token is missing, malformed, or expired.
    Unauthorized,
    /// The caller does not own the transfer.
    Forbidden,
    /// Request input failed validation.
    Validation,
    /// Declared transfer size is zero or above the configured ceiling.
    InvalidSize,
    /// The operation is not valid for the transfer's lifecycle state.
    InvalidState,
    /// Chunk index is outside `[0, expected_chunk_count)`.
    OutOfRange,
    /// A chunk or the assembled archive has the wrong byte length.
    SizeMismatch,
    /// Assembly was requested while chunks are still missing.
    IncompleteUpload,
    /// Another assembly for the same transfer is running or has finished.
    AlreadyAssembling,
    /// The transfer has no sealed archive yet.
    NotReady,
    /// The transfer is past its expiry.
    Expired,
    /// The sealed archive is not a readable container.
    InvalidArchive,
    /// A storage I/O error occurred. Transient, the caller may retry.
    Storage,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Validation => "VALIDATION",
            Self::InvalidSize => "INVALID_SIZE",
            Self::InvalidState => "INVALID_STATE",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::SizeMismatch => "SIZE_MISMATCH",
            Self::IncompleteUpload => "INCOMPLETE_UPLOAD",
            Self::AlreadyAssembling => "ALREADY_ASSEMBLING",
            Self::NotReady => "NOT_READY",
            Self::Expired => "EXPIRED",
            Self::InvalidArchive => "INVALID_ARCHIVE",
            Self::Storage => "STORAGE_ERROR",
            Self::Database => "DATABASE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The unified application error used throughout BigDrop.
///
/// `details` carries structured diagnostics that are safe to show to the
/// client, such as the missing chunk indices of an incomplete upload.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional structured details.
    pub details: Option<serde_json::Value>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: Some(Box::new(source)),
        }
    }

    /// Attach structured details to this error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an invalid-size error.
    pub fn invalid_size(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSize, message)
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    /// Create an out-of-range error.
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfRange, message)
    }

    /// Create a size-mismatch error.
    pub fn size_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SizeMismatch, message)
    }

    /// Create an incomplete-upload error listing the missing chunk indices.
    pub fn incomplete_upload(missing: &[u32]) -> Self {
        Self::new(
            ErrorKind::IncompleteUpload,
            format!("{} chunk(s) not uploaded yet", missing.len()),
        )
        .with_details(serde_json::json!({ "missing": missing }))
    }

    /// Create an already-assembling error.
    pub fn already_assembling(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyAssembling, message)
    }

    /// Create a not-ready error.
    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotReady, message)
    }

    /// Create an expired error.
    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expired, message)
    }

    /// Create an invalid-archive error.
    pub fn invalid_archive(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArchive, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            details: self.details.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::with_source(ErrorKind::NotFound, format!("Not found: {err}"), err);
        }
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
