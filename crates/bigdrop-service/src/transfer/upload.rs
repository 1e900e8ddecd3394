//! Chunk upload rules on top of the raw chunk store.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use bigdrop_core::error::AppError;
use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::TransferId;
use bigdrop_database::repositories::TransferRepository;
use bigdrop_entity::transfer::{Transfer, TransferState};
use bigdrop_storage::ChunkStore;

use super::locks::TransferLocks;
use super::registry::ensure_owner;
use crate::context::RequestContext;

/// Acknowledgement of a stored chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkReceipt {
    /// Transfer the chunk belongs to.
    pub transfer_id: TransferId,
    /// Chunk index.
    pub index: u32,
    /// Bytes stored.
    pub size: u64,
}

/// Accepts chunks for transfers in the `Uploading` state.
///
/// Writes hold the shared side of the transfer lock, so chunks of one
/// transfer land in parallel while cancel and assembly wait for them.
#[derive(Clone)]
pub struct UploadService {
    repo: Arc<dyn TransferRepository>,
    chunks: ChunkStore,
    locks: Arc<TransferLocks>,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService").finish()
    }
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        chunks: ChunkStore,
        locks: Arc<TransferLocks>,
    ) -> Self {
        Self {
            repo,
            chunks,
            locks,
        }
    }

    /// Stores chunk `index`, replacing any earlier upload of the same index.
    pub async fn put_chunk(
        &self,
        ctx: &RequestContext,
        transfer_id: TransferId,
        index: u32,
        data: Bytes,
    ) -> AppResult<ChunkReceipt> {
        let _guard = self.locks.shared(transfer_id).await;

        let transfer = self.load(ctx, transfer_id).await?;
        check_chunk(&transfer, index, data.len() as u64)?;

        let size = self.chunks.put(transfer_id, index, data).await?;
        self.repo.touch(transfer_id, Utc::now()).await?;

        debug!(transfer_id = %transfer_id, index, bytes = size, "Chunk accepted");
        Ok(ChunkReceipt {
            transfer_id,
            index,
            size,
        })
    }

    /// Whether every chunk slot of the transfer is filled.
    pub async fn has_all_chunks(&self, ctx: &RequestContext, transfer_id: TransferId) -> AppResult<bool> {
        let transfer = self.load(ctx, transfer_id).await?;
        self.chunks.has_all(transfer_id, transfer.chunk_count()).await
    }

    async fn load(&self, ctx: &RequestContext, transfer_id: TransferId) -> AppResult<Transfer> {
        let now = Utc::now();
        let transfer = self
            .repo
            .find_by_id(transfer_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Transfer {transfer_id} not found")))?
            .observed(now);
        ensure_owner(ctx, &transfer)?;
        Ok(transfer)
    }
}

/// Validates state, index and length of an incoming chunk.
///
/// Every chunk but the last must be exactly `max_chunk_size` long. The
/// last one may not exceed the declared remainder; a short last chunk is
/// caught by the total-length check at assembly.
fn check_chunk(transfer: &Transfer, index: u32, len: u64) -> AppResult<()> {
    if transfer.state != TransferState::Uploading {
        return Err(AppError::invalid_state(format!(
            "Transfer {} does not accept chunks in state {}",
            transfer.id, transfer.state
        )));
    }

    let count = transfer.chunk_count();
    let expected = transfer.expected_chunk_len(index).ok_or_else(|| {
        AppError::out_of_range(format!(
            "Chunk index {index} is outside 0..{count} for transfer {}",
            transfer.id
        ))
    })?;

    let is_last = index + 1 == count;
    let fits = if is_last {
        len > 0 && len <= expected
    } else {
        len == expected
    };
    if !fits {
        return Err(AppError::size_mismatch(format!(
            "Chunk {index} is {len} bytes, expected {}{expected}",
            if is_last { "at most " } else { "" }
        )));
    }
    Ok(())
}
