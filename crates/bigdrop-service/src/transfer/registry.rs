//! Transfer registry: creation, lookup, metadata updates, cancel and delete.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bigdrop_core::config::TransferConfig;
use bigdrop_core::error::AppError;
use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::TransferId;
use bigdrop_database::repositories::{TransferPatch, TransferRepository};
use bigdrop_entity::transfer::{Expiry, Transfer, TransferState};
use bigdrop_storage::{ChunkAssembler, ChunkStore};

use super::locks::TransferLocks;
use crate::context::RequestContext;

/// Input for [`TransferRegistry::create`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTransfer {
    /// Declared archive size in bytes.
    pub size: i64,
    /// Optional share message.
    pub message: Option<String>,
    /// Requested expiry; the configured default applies when absent.
    pub expiry: Option<Expiry>,
}

/// Input for [`TransferRegistry::update`]. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTransfer {
    /// New message; an empty string clears it.
    pub message: Option<String>,
    /// New expiry, resolved against the transfer's creation time.
    pub expiry: Option<Expiry>,
}

/// Which chunk slots of a transfer are filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferProgress {
    /// The transfer, with its effective state.
    pub transfer: Transfer,
    /// Indices with a stored chunk, ascending.
    pub stored_indices: Vec<u32>,
    /// Indices still to upload, ascending.
    pub missing_indices: Vec<u32>,
}

/// Owns the transfer table and the lifecycle rules around it.
#[derive(Clone)]
pub struct TransferRegistry {
    repo: Arc<dyn TransferRepository>,
    chunks: ChunkStore,
    assembler: ChunkAssembler,
    locks: Arc<TransferLocks>,
    config: TransferConfig,
}

impl std::fmt::Debug for TransferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRegistry").finish()
    }
}

impl TransferRegistry {
    /// Creates a new registry.
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        chunks: ChunkStore,
        assembler: ChunkAssembler,
        locks: Arc<TransferLocks>,
        config: TransferConfig,
    ) -> Self {
        Self {
            repo,
            chunks,
            assembler,
            locks,
            config,
        }
    }

    /// Chunk size handed to every new transfer.
    pub fn max_chunk_size(&self) -> u64 {
        self.config.max_chunk_size_bytes
    }

    fn retention(&self) -> Duration {
        Duration::hours(self.config.expired_retention_hours as i64)
    }

    fn default_expiry(&self) -> AppResult<Expiry> {
        self.config.default_expiry.parse().map_err(|e: String| {
            AppError::configuration(format!("transfer.default_expiry: {e}"))
        })
    }

    /// Registers a new transfer and opens it for chunk uploads.
    pub async fn create(&self, ctx: &RequestContext, input: CreateTransfer) -> AppResult<Transfer> {
        let ceiling = self.config.max_transfer_size_bytes;
        if input.size <= 0 {
            return Err(AppError::invalid_size("Transfer size must be positive"));
        }
        if input.size as u64 > ceiling {
            return Err(AppError::invalid_size(format!(
                "Transfer size {} exceeds the maximum of {ceiling} bytes",
                input.size
            )));
        }

        let now = ctx.request_time;
        let expiry = match input.expiry {
            Some(expiry) => expiry,
            None => self.default_expiry()?,
        };
        let expires_at = future_deadline(expiry, now, now)?;
        let message = input.message.filter(|m| !m.trim().is_empty());

        let mut transfer = Transfer::new(
            ctx.owner_id,
            input.size as u64,
            self.config.max_chunk_size_bytes,
            message,
            expires_at,
            now,
        );
        transfer.transition(TransferState::Uploading, now)?;
        self.repo.insert(&transfer).await?;

        info!(
            transfer_id = %transfer.id,
            owner_id = %transfer.owner_id,
            size = transfer.size,
            chunks = transfer.expected_chunk_count,
            expires_at = %transfer.expires_at,
            "Transfer created"
        );
        Ok(transfer)
    }

    /// Loads a transfer with its effective state.
    ///
    /// Transfers expired for longer than the retention window read as
    /// not found even before the reaper removes them.
    pub async fn get(&self, id: TransferId) -> AppResult<Transfer> {
        let now = Utc::now();
        let transfer = self
            .repo
            .find_by_id(id)
            .await?
            .filter(|t| !t.is_past_retention(now, self.retention()))
            .ok_or_else(|| AppError::not_found(format!("Transfer {id} not found")))?;
        Ok(transfer.observed(now))
    }

    /// Loads a transfer the caller owns.
    pub async fn get_owned(&self, ctx: &RequestContext, id: TransferId) -> AppResult<Transfer> {
        let transfer = self.get(id).await?;
        ensure_owner(ctx, &transfer)?;
        Ok(transfer)
    }

    /// Changes the message and/or expiry while the transfer is still open.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: TransferId,
        input: UpdateTransfer,
    ) -> AppResult<Transfer> {
        if input.message.is_none() && input.expiry.is_none() {
            return Err(AppError::validation(
                "At least one of message or expiry must be provided",
            ));
        }

        let transfer = self.get_owned(ctx, id).await?;
        if !matches!(
            transfer.state,
            TransferState::Pending | TransferState::Uploading
        ) {
            return Err(AppError::invalid_state(format!(
                "Transfer {id} can no longer be updated in state {}",
                transfer.state
            )));
        }

        let expires_at = input
            .expiry
            .map(|expiry| future_deadline(expiry, transfer.created_at, ctx.request_time))
            .transpose()?;
        let patch = TransferPatch {
            message: input.message,
            expires_at,
        };

        let updated = self
            .repo
            .update_details(id, &patch, ctx.request_time)
            .await?
            .ok_or_else(|| {
                AppError::invalid_state(format!("Transfer {id} changed state during update"))
            })?;

        debug!(transfer_id = %id, "Transfer details updated");
        Ok(updated.observed(Utc::now()))
    }

    /// Transfers owned by the caller, newest first.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<Transfer>> {
        let now = Utc::now();
        let retention = self.retention();
        Ok(self
            .repo
            .list_by_owner(ctx.owner_id)
            .await?
            .into_iter()
            .filter(|t| !t.is_past_retention(now, retention))
            .map(|t| t.observed(now))
            .collect())
    }

    /// Stored and missing chunk indices, for resuming an interrupted upload.
    pub async fn progress(&self, ctx: &RequestContext, id: TransferId) -> AppResult<TransferProgress> {
        let transfer = self.get_owned(ctx, id).await?;
        let expected = transfer.chunk_count();
        let stored_indices = self.chunks.stored_indices(id, expected).await?;
        let missing_indices = complement(&stored_indices, expected);
        Ok(TransferProgress {
            transfer,
            stored_indices,
            missing_indices,
        })
    }

    /// Stops an upload in progress and frees its chunks.
    pub async fn cancel(&self, ctx: &RequestContext, id: TransferId) -> AppResult<Transfer> {
        let _guard = self.locks.exclusive(id).await;

        let transfer = self.get_owned(ctx, id).await?;
        if transfer.state != TransferState::Uploading {
            return Err(AppError::invalid_state(format!(
                "Only uploading transfers can be cancelled; {id} is {}",
                transfer.state
            )));
        }
        let now = Utc::now();
        if !self
            .repo
            .transition(id, TransferState::Uploading, TransferState::Cancelled, now)
            .await?
        {
            return Err(AppError::invalid_state(format!(
                "Transfer {id} changed state during cancel"
            )));
        }
        self.chunks.purge(id).await?;

        info!(transfer_id = %id, "Transfer cancelled");
        self.get(id).await
    }

    /// Removes a transfer with its chunks and archive.
    ///
    /// Deleting an unknown transfer succeeds, so retried deletes are safe.
    pub async fn delete(&self, ctx: &RequestContext, id: TransferId) -> AppResult<()> {
        let _guard = self.locks.exclusive(id).await;

        let Some(transfer) = self.repo.find_by_id(id).await? else {
            debug!(transfer_id = %id, "Delete of unknown transfer ignored");
            return Ok(());
        };
        ensure_owner(ctx, &transfer)?;
        if transfer.state == TransferState::Assembling {
            return Err(AppError::invalid_state(format!(
                "Transfer {id} is being assembled"
            )));
        }

        self.remove_all(&transfer).await?;

        info!(transfer_id = %id, "Transfer deleted");
        Ok(())
    }

    /// Removes a transfer selected by the reaper.
    ///
    /// The record is re-read under the transfer lock; if its state or
    /// activity moved since `snapshot` was taken, nothing is removed and
    /// `false` is returned.
    pub async fn purge(&self, snapshot: &Transfer) -> AppResult<bool> {
        let _guard = self.locks.exclusive(snapshot.id).await;

        let Some(current) = self.repo.find_by_id(snapshot.id).await? else {
            return Ok(false);
        };
        if current.state != snapshot.state
            || current.state == TransferState::Assembling
            || current.last_activity_at != snapshot.last_activity_at
            || current.expires_at != snapshot.expires_at
        {
            return Ok(false);
        }

        self.remove_all(&current).await?;
        Ok(true)
    }

    async fn remove_all(&self, transfer: &Transfer) -> AppResult<()> {
        self.chunks.purge(transfer.id).await?;
        self.assembler.discard(transfer.id).await?;
        self.repo.delete(transfer.id).await?;
        Ok(())
    }
}

/// Fails with `Forbidden` unless the caller owns the transfer.
pub(crate) fn ensure_owner(ctx: &RequestContext, transfer: &Transfer) -> AppResult<()> {
    if transfer.is_owned_by(&ctx.owner_id) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Transfer {} belongs to another user",
            transfer.id
        )))
    }
}

fn future_deadline(
    expiry: Expiry,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<DateTime<Utc>> {
    let deadline = expiry.resolve(created_at);
    if deadline <= now {
        return Err(AppError::validation(format!(
            "Expiry {expiry} is already in the past"
        )));
    }
    Ok(deadline)
}

fn complement(stored: &[u32], expected: u32) -> Vec<u32> {
    (0..expected).filter(|i| stored.binary_search(i).is_err()).collect()
}
