//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use bigdrop_core::error::AppError;
use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::TransferId;
use bigdrop_entity::transfer::Expiry;
use bigdrop_service::transfer::{CreateTransfer, UpdateTransfer};

/// Create transfer request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTransferRequest {
    /// Declared archive size in bytes.
    pub size: i64,
    /// Optional share message.
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    /// `1h`, `24h`, `7d`, `30d` or an RFC 3339 timestamp.
    pub expiry: Option<String>,
}

impl CreateTransferRequest {
    /// Converts into the service input.
    pub fn into_input(self) -> AppResult<CreateTransfer> {
        Ok(CreateTransfer {
            size: self.size,
            message: self.message,
            expiry: parse_expiry(self.expiry)?,
        })
    }
}

/// Update transfer request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateTransferRequest {
    /// Transfer to update.
    pub transfer_id: TransferId,
    /// New message; an empty string clears it.
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    /// New expiry.
    pub expiry: Option<String>,
}

impl UpdateTransferRequest {
    /// Converts into the service input.
    pub fn into_input(self) -> AppResult<UpdateTransfer> {
        Ok(UpdateTransfer {
            message: self.message,
            expiry: parse_expiry(self.expiry)?,
        })
    }
}

/// Body naming a single transfer (assemble, cancel).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferIdRequest {
    /// Target transfer.
    #[serde(alias = "id", alias = "uploadId")]
    pub transfer_id: TransferId,
}

/// Blank strings count as "not given".
fn parse_expiry(raw: Option<String>) -> AppResult<Option<Expiry>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Expiry>().map_err(AppError::validation))
        .transpose()
}
