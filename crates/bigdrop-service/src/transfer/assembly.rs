//! Assembly: seals a fully uploaded transfer into its archive.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use bigdrop_core::error::AppError;
use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::TransferId;
use bigdrop_database::repositories::TransferRepository;
use bigdrop_entity::archive::FileEntry;
use bigdrop_entity::transfer::{Transfer, TransferState};
use bigdrop_storage::{ArchiveReader, ChunkAssembler, ChunkStore};

use super::locks::TransferLocks;
use super::registry::ensure_owner;
use crate::context::RequestContext;

/// A sealed transfer and the files found in its archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledTransfer {
    /// The transfer, now `Ready`.
    pub transfer: Transfer,
    /// Files in the archive.
    pub entries: Vec<FileEntry>,
}

/// Merges stored chunks into one archive, at most once per transfer.
#[derive(Clone)]
pub struct AssemblyEngine {
    repo: Arc<dyn TransferRepository>,
    chunks: ChunkStore,
    assembler: ChunkAssembler,
    archives: ArchiveReader,
    locks: Arc<TransferLocks>,
    retain_chunks: bool,
}

impl std::fmt::Debug for AssemblyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyEngine")
            .field("retain_chunks", &self.retain_chunks)
            .finish()
    }
}

impl AssemblyEngine {
    /// Creates a new assembly engine.
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        chunks: ChunkStore,
        assembler: ChunkAssembler,
        archives: ArchiveReader,
        locks: Arc<TransferLocks>,
        retain_chunks: bool,
    ) -> Self {
        Self {
            repo,
            chunks,
            assembler,
            archives,
            locks,
            retain_chunks,
        }
    }

    /// Seals the transfer.
    ///
    /// The `Uploading → Assembling` switch happens under the exclusive
    /// transfer lock, so a concurrent call sees `Assembling` and fails with
    /// `AlreadyAssembling`. The concatenation itself runs on its own task
    /// and always finishes in `Ready` or back in `Uploading`, even if the
    /// caller goes away.
    pub async fn assemble(
        &self,
        ctx: &RequestContext,
        transfer_id: TransferId,
    ) -> AppResult<AssembledTransfer> {
        let transfer = self.begin(ctx, transfer_id).await?;

        let engine = self.clone();
        tokio::spawn(async move { engine.seal(transfer).await })
            .await
            .map_err(|e| AppError::internal(format!("Assembly task failed: {e}")))?
    }

    async fn begin(&self, ctx: &RequestContext, transfer_id: TransferId) -> AppResult<Transfer> {
        let _guard = self.locks.exclusive(transfer_id).await;

        let transfer = self
            .repo
            .find_by_id(transfer_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Transfer {transfer_id} not found")))?
            .observed(Utc::now());
        ensure_owner(ctx, &transfer)?;

        match transfer.state {
            TransferState::Uploading => {}
            TransferState::Assembling | TransferState::Ready => {
                return Err(AppError::already_assembling(format!(
                    "Transfer {transfer_id} is already {}",
                    transfer.state
                )));
            }
            other => {
                return Err(AppError::invalid_state(format!(
                    "Transfer {transfer_id} cannot be assembled in state {other}"
                )));
            }
        }

        let missing = self
            .chunks
            .missing_indices(transfer_id, transfer.chunk_count())
            .await?;
        if !missing.is_empty() {
            return Err(AppError::incomplete_upload(&missing));
        }

        let now = Utc::now();
        if !self
            .repo
            .transition(transfer_id, TransferState::Uploading, TransferState::Assembling, now)
            .await?
        {
            return Err(AppError::already_assembling(format!(
                "Transfer {transfer_id} is already being assembled"
            )));
        }

        info!(transfer_id = %transfer_id, chunks = transfer.chunk_count(), "Assembly started");
        Ok(transfer)
    }

    async fn seal(&self, transfer: Transfer) -> AppResult<AssembledTransfer> {
        let id = transfer.id;
        match self.build(&transfer).await {
            Ok((transfer, entries)) => {
                if !self.retain_chunks {
                    if let Err(e) = self.chunks.purge(id).await {
                        warn!(transfer_id = %id, error = %e, "Failed to free chunks after assembly");
                    }
                }
                info!(transfer_id = %id, files = entries.len(), "Transfer ready");
                Ok(AssembledTransfer {
                    transfer: transfer.observed(Utc::now()),
                    entries,
                })
            }
            Err(e) => {
                warn!(transfer_id = %id, error = %e, "Assembly failed, reverting to uploading");
                self.rollback(id).await;
                Err(e)
            }
        }
    }

    /// Writes the archive, verifies it and flips the record to `Ready`.
    ///
    /// Returns the sealed record as written, without reading it back.
    async fn build(&self, transfer: &Transfer) -> AppResult<(Transfer, Vec<FileEntry>)> {
        let id = transfer.id;
        let written = self.assembler.assemble(id, transfer.chunk_count()).await?;
        if written != transfer.size_bytes() {
            return Err(AppError::size_mismatch(format!(
                "Assembled {written} bytes but transfer {id} declares {}",
                transfer.size
            )));
        }

        let key = self.assembler.archive_key(id);
        let entries = self.archives.entries(&key, id).await?;

        let now = Utc::now();
        if !self.repo.mark_ready(id, &key, now).await? {
            return Err(AppError::invalid_state(format!(
                "Transfer {id} left the assembling state"
            )));
        }

        let mut sealed = transfer.clone();
        sealed.state = TransferState::Ready;
        sealed.archive_key = Some(key);
        sealed.updated_at = now;
        Ok((sealed, entries))
    }

    async fn rollback(&self, id: TransferId) {
        if let Err(e) = self.assembler.discard(id).await {
            error!(transfer_id = %id, error = %e, "Failed to discard partial archive");
        }
        match self
            .repo
            .transition(id, TransferState::Assembling, TransferState::Uploading, Utc::now())
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(transfer_id = %id, "Transfer was not assembling during rollback"),
            Err(e) => error!(transfer_id = %id, error = %e, "Failed to revert transfer state"),
        }
    }

    /// Returns a transfer stuck in `Assembling` to `Uploading`.
    ///
    /// Used by the reaper for assemblies interrupted by a restart.
    pub async fn recover_stalled(&self, transfer: &Transfer) -> AppResult<bool> {
        let _guard = self.locks.exclusive(transfer.id).await;

        let reverted = self
            .repo
            .transition(
                transfer.id,
                TransferState::Assembling,
                TransferState::Uploading,
                Utc::now(),
            )
            .await?;
        if reverted {
            self.assembler.discard(transfer.id).await?;
            warn!(transfer_id = %transfer.id, "Stalled assembly reverted to uploading");
        }
        Ok(reverted)
    }
}
