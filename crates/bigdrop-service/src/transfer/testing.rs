//! Shared fixtures for service tests.

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use bigdrop_core::config::TransferConfig;
use bigdrop_core::traits::storage::StorageProvider;
use bigdrop_core::error::AppError;
use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::{OwnerId, TransferId};
use bigdrop_database::repositories::{
    MemoryTransferRepository, ReapCutoffs, TransferPatch, TransferRepository,
};
use bigdrop_entity::transfer::{Transfer, TransferState};
use bigdrop_storage::{ChunkStore, LocalStorageProvider};

use super::{
    AssemblyEngine, DownloadServer, TransferLocks, TransferRegistry, TransferServices, UploadService,
};
use crate::context::RequestContext;

pub(crate) struct Harness {
    pub _dir: TempDir,
    pub owner: OwnerId,
    pub repo: Arc<dyn TransferRepository>,
    pub provider: Arc<dyn StorageProvider>,
    pub chunks: ChunkStore,
    pub registry: TransferRegistry,
    pub uploads: UploadService,
    pub engine: AssemblyEngine,
    pub downloads: DownloadServer,
    pub locks: Arc<TransferLocks>,
}

impl Harness {
    pub async fn new(max_chunk_size: u64) -> Self {
        Self::with_repo(max_chunk_size, Arc::new(MemoryTransferRepository::new())).await
    }

    pub async fn with_repo(max_chunk_size: u64, repo: Arc<dyn TransferRepository>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let provider: Arc<dyn StorageProvider> =
            Arc::new(LocalStorageProvider::new(dir.path()).await.unwrap());
        let config = TransferConfig {
            max_chunk_size_bytes: max_chunk_size,
            max_transfer_size_bytes: 64 * 1024 * 1024,
            ..Default::default()
        };

        let services = TransferServices::build(
            repo.clone(),
            provider.clone(),
            "_chunks",
            "_archives",
            config,
        );
        let chunks = ChunkStore::new(provider.clone(), "_chunks");

        Self {
            _dir: dir,
            owner: OwnerId::new(),
            repo,
            provider,
            chunks,
            registry: services.registry.as_ref().clone(),
            uploads: services.uploads.as_ref().clone(),
            engine: services.assembly.as_ref().clone(),
            downloads: services.downloads.as_ref().clone(),
            locks: services.locks.clone(),
        }
    }

    pub fn ctx(&self) -> RequestContext {
        RequestContext::new(self.owner)
    }
}

/// Zip with stored (uncompressed) entries, so chunk sizes are predictable.
pub(crate) fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Single-entry zip whose total length is exactly `total` bytes.
pub(crate) fn zip_of_len(name: &str, total: usize) -> Vec<u8> {
    let overhead = zip_of(&[(name, b"".as_slice())]).len();
    let body = vec![0x5au8; total - overhead];
    zip_of(&[(name, body.as_slice())])
}

/// Memory registry whose reads start failing once a transfer is sealed.
#[derive(Debug, Default)]
pub(crate) struct ReadsFailAfterSeal {
    pub inner: MemoryTransferRepository,
    sealed: AtomicBool,
}

#[async_trait]
impl TransferRepository for ReadsFailAfterSeal {
    async fn insert(&self, transfer: &Transfer) -> AppResult<()> {
        self.inner.insert(transfer).await
    }

    async fn find_by_id(&self, id: TransferId) -> AppResult<Option<Transfer>> {
        if self.sealed.load(Ordering::SeqCst) {
            return Err(AppError::database("connection reset"));
        }
        self.inner.find_by_id(id).await
    }

    async fn list_by_owner(&self, owner: OwnerId) -> AppResult<Vec<Transfer>> {
        self.inner.list_by_owner(owner).await
    }

    async fn update_details(
        &self,
        id: TransferId,
        patch: &TransferPatch,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Transfer>> {
        self.inner.update_details(id, patch, now).await
    }

    async fn transition(
        &self,
        id: TransferId,
        from: TransferState,
        to: TransferState,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.inner.transition(id, from, to, now).await
    }

    async fn mark_ready(
        &self,
        id: TransferId,
        archive_key: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let sealed = self.inner.mark_ready(id, archive_key, now).await?;
        self.sealed.store(sealed, Ordering::SeqCst);
        Ok(sealed)
    }

    async fn increment_downloads(&self, id: TransferId) -> AppResult<Option<i64>> {
        self.inner.increment_downloads(id).await
    }

    async fn touch(&self, id: TransferId, now: DateTime<Utc>) -> AppResult<()> {
        self.inner.touch(id, now).await
    }

    async fn delete(&self, id: TransferId) -> AppResult<bool> {
        self.inner.delete(id).await
    }

    async fn find_reapable(&self, cutoffs: &ReapCutoffs) -> AppResult<Vec<Transfer>> {
        self.inner.find_reapable(cutoffs).await
    }

    async fn find_stalled_assemblies(&self, before: DateTime<Utc>) -> AppResult<Vec<Transfer>> {
        self.inner.find_stalled_assemblies(before).await
    }
}
