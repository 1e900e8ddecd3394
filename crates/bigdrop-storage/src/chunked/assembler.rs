//! Chunk assembler: concatenates stored chunks into one sealed archive.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};

use bigdrop_core::result::AppResult;
use bigdrop_core::traits::storage::{ByteStream, StorageProvider};
use bigdrop_core::types::id::TransferId;

use super::store::ChunkStore;

/// Streams chunks `0..count` in index order into the archive object.
///
/// Chunks carry no length prefix, so the index order is the only thing
/// that keeps the container's internal offsets intact.
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    chunks: ChunkStore,
    target: Arc<dyn StorageProvider>,
    archive_prefix: String,
}

impl ChunkAssembler {
    /// Create a new chunk assembler.
    pub fn new(
        chunks: ChunkStore,
        target: Arc<dyn StorageProvider>,
        archive_prefix: impl Into<String>,
    ) -> Self {
        Self {
            chunks,
            target,
            archive_prefix: archive_prefix.into(),
        }
    }

    /// Storage key of a transfer's sealed archive.
    pub fn archive_key(&self, transfer_id: TransferId) -> String {
        format!("{}/{transfer_id}.zip", self.archive_prefix)
    }

    /// Concatenate all chunks into the archive object and return its length.
    ///
    /// Only one chunk is in flight at a time; the archive is never held in
    /// memory. On failure no archive object is left behind.
    pub async fn assemble(&self, transfer_id: TransferId, chunk_count: u32) -> AppResult<u64> {
        let key = self.archive_key(transfer_id);
        tracing::info!(
            transfer_id = %transfer_id,
            chunk_count,
            archive = %key,
            "Assembling chunks"
        );

        let chunks = self.chunks.clone();
        let ordered: ByteStream = Box::pin(
            futures::stream::iter(0..chunk_count)
                .then(move |index| {
                    let chunks = chunks.clone();
                    async move { chunks.read_stream(transfer_id, index).await }
                })
                .map_err(std::io::Error::other)
                .try_flatten(),
        );

        let written = self.target.write_stream(&key, ordered).await?;

        tracing::info!(transfer_id = %transfer_id, bytes = written, "Assembly complete");
        Ok(written)
    }

    /// Remove a transfer's archive. Missing archives are fine.
    pub async fn discard(&self, transfer_id: TransferId) -> AppResult<()> {
        self.target.delete(&self.archive_key(transfer_id)).await
    }
}
