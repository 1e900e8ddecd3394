//! Typed path parameter helpers.

use bigdrop_core::error::AppError;
use bigdrop_core::types::id::TransferId;
use bigdrop_entity::archive::FileEntryId;

/// Parses a transfer id from a path segment.
pub fn parse_transfer_id(s: &str) -> Result<TransferId, AppError> {
    s.parse::<TransferId>()
        .map_err(|_| AppError::validation(format!("Invalid transfer id: {s}")))
}

/// Parses a `{transferId}.{index}` file id from a path segment.
pub fn parse_file_id(s: &str) -> Result<FileEntryId, AppError> {
    s.parse::<FileEntryId>()
        .map_err(|_| AppError::validation(format!("Invalid file id: {s}")))
}
