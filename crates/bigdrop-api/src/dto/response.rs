//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bigdrop_core::types::id::TransferId;
use bigdrop_entity::archive::FileEntry;
use bigdrop_entity::transfer::{Transfer, TransferState};

/// Returned by `POST /transfer/new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferResponse {
    /// New transfer id.
    pub transfer_id: TransferId,
    /// Size every chunk but the last must have.
    pub max_chunk_size: i64,
    /// Number of chunks to upload.
    pub expected_chunk_count: i32,
    /// Absolute expiry deadline.
    pub expires_at: DateTime<Utc>,
}

impl From<&Transfer> for CreateTransferResponse {
    fn from(t: &Transfer) -> Self {
        Self {
            transfer_id: t.id,
            max_chunk_size: t.max_chunk_size,
            expected_chunk_count: t.expected_chunk_count,
            expires_at: t.expires_at,
        }
    }
}

/// Owner's view of a transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    /// Transfer id.
    pub id: TransferId,
    /// Declared size in bytes.
    pub size: i64,
    /// Negotiated chunk size.
    pub max_chunk_size: i64,
    /// Number of chunks.
    pub expected_chunk_count: i32,
    /// Share message.
    pub message: Option<String>,
    /// Expiry deadline.
    pub expires_at: DateTime<Utc>,
    /// Effective lifecycle state.
    pub state: TransferState,
    /// Completed download starts.
    pub download_count: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl From<Transfer> for TransferResponse {
    fn from(t: Transfer) -> Self {
        Self {
            id: t.id,
            size: t.size,
            max_chunk_size: t.max_chunk_size,
            expected_chunk_count: t.expected_chunk_count,
            message: t.message,
            expires_at: t.expires_at,
            state: t.state,
            download_count: t.download_count,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Resume information for an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStatusResponse {
    /// The transfer.
    pub transfer: TransferResponse,
    /// Indices already stored.
    pub stored_indices: Vec<u32>,
    /// Indices still to send.
    pub missing_indices: Vec<u32>,
    /// Whether assembly may be requested.
    pub complete: bool,
}

/// Returned by `POST /transfer/assemble`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembleResponse {
    /// The sealed transfer.
    pub transfer: TransferResponse,
    /// Files in the archive.
    pub files: Vec<FileEntry>,
}

/// Public share page data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    /// Transfer id.
    pub id: TransferId,
    /// Share message.
    pub message: Option<String>,
    /// Archive size in bytes.
    pub size: i64,
    /// Expiry deadline.
    pub expires_at: DateTime<Utc>,
    /// Completed download starts.
    pub download_count: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Effective state, always `ready` here.
    pub state: TransferState,
    /// Files in the archive.
    pub files: Vec<FileEntry>,
}

/// Returned by `DELETE /transfer/delete/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// The id that is now gone.
    pub transfer_id: TransferId,
    /// Always true; deleting an unknown id also succeeds.
    pub deleted: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Storage provider status.
    pub storage: String,
}
