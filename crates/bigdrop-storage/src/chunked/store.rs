//! Individually stored chunks keyed by `(transfer_id, index)`.
//!
//! Each chunk is its own object, so upload order does not matter and a
//! re-sent chunk simply replaces the previous bytes at that index.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;

use bigdrop_core::result::AppResult;
use bigdrop_core::traits::storage::{ByteStream, StorageProvider};
use bigdrop_core::types::id::TransferId;

/// Chunk I/O over a [`StorageProvider`].
#[derive(Debug, Clone)]
pub struct ChunkStore {
    provider: Arc<dyn StorageProvider>,
    prefix: String,
}

impl ChunkStore {
    /// Create a chunk store writing under `prefix`.
    pub fn new(provider: Arc<dyn StorageProvider>, prefix: impl Into<String>) -> Self {
        Self {
            provider,
            prefix: prefix.into(),
        }
    }

    /// Store (or replace) chunk `index`. Returns the bytes written.
    pub async fn put(&self, transfer_id: TransferId, index: u32, data: Bytes) -> AppResult<u64> {
        let len = data.len() as u64;
        self.provider
            .write(&self.chunk_path(transfer_id, index), data)
            .await?;
        tracing::debug!(transfer_id = %transfer_id, index, bytes = len, "Stored chunk");
        Ok(len)
    }

    /// Read a whole chunk into memory.
    pub async fn read(&self, transfer_id: TransferId, index: u32) -> AppResult<Bytes> {
        self.provider
            .read_bytes(&self.chunk_path(transfer_id, index))
            .await
    }

    /// Stream a chunk.
    pub async fn read_stream(&self, transfer_id: TransferId, index: u32) -> AppResult<ByteStream> {
        self.provider.read(&self.chunk_path(transfer_id, index)).await
    }

    /// Sorted indices below `expected` that currently have a stored chunk.
    pub async fn stored_indices(&self, transfer_id: TransferId, expected: u32) -> AppResult<Vec<u32>> {
        let listed = self.provider.list(&self.transfer_dir(transfer_id)).await?;
        let stored: BTreeSet<u32> = listed
            .iter()
            .filter(|meta| !meta.is_directory)
            .filter_map(|meta| parse_chunk_name(&meta.name))
            .filter(|index| *index < expected)
            .collect();
        Ok(stored.into_iter().collect())
    }

    /// Indices in `[0, expected)` with no stored chunk, ascending.
    pub async fn missing_indices(
        &self,
        transfer_id: TransferId,
        expected: u32,
    ) -> AppResult<Vec<u32>> {
        let stored: BTreeSet<u32> = self
            .stored_indices(transfer_id, expected)
            .await?
            .into_iter()
            .collect();
        Ok((0..expected).filter(|i| !stored.contains(i)).collect())
    }

    /// Whether every index in `[0, expected)` has a stored chunk.
    pub async fn has_all(&self, transfer_id: TransferId, expected: u32) -> AppResult<bool> {
        Ok(self.missing_indices(transfer_id, expected).await?.is_empty())
    }

    /// Delete every chunk of a transfer. Purging twice is a no-op.
    pub async fn purge(&self, transfer_id: TransferId) -> AppResult<()> {
        self.provider
            .delete_dir(&self.transfer_dir(transfer_id))
            .await?;
        tracing::debug!(transfer_id = %transfer_id, "Purged chunks");
        Ok(())
    }

    /// Transfer ids that have a chunk directory.
    pub async fn transfer_ids(&self) -> AppResult<Vec<TransferId>> {
        let listed = self.provider.list(&self.prefix).await?;
        Ok(listed
            .iter()
            .filter(|meta| meta.is_directory)
            .filter_map(|meta| meta.name.parse().ok())
            .collect())
    }

    /// Storage key of one chunk.
    pub fn chunk_path(&self, transfer_id: TransferId, index: u32) -> String {
        format!("{}/{transfer_id}/{index:06}", self.prefix)
    }

    /// Storage key of a transfer's chunk directory.
    pub fn transfer_dir(&self, transfer_id: TransferId) -> String {
        format!("{}/{transfer_id}", self.prefix)
    }
}

/// Chunk objects are named by their zero-padded index; anything else
/// (staging files, stray names) is ignored.
fn parse_chunk_name(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}
