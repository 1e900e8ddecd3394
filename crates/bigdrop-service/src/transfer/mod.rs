//! Transfer lifecycle: registry, chunk upload, assembly and downloads.

pub mod assembly;
pub mod download;
pub mod locks;
pub mod registry;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use bigdrop_core::config::TransferConfig;
use bigdrop_core::traits::storage::StorageProvider;
use bigdrop_database::repositories::TransferRepository;
use bigdrop_storage::{ArchiveReader, ChunkAssembler, ChunkStore};

pub use assembly::{AssembledTransfer, AssemblyEngine};
pub use download::{ArchiveDownload, DownloadServer, FileDownload, SharedTransfer};
pub use locks::{ExclusiveGuard, SharedGuard, TransferGuard, TransferLocks};
pub use registry::{CreateTransfer, TransferProgress, TransferRegistry, UpdateTransfer};
pub use upload::{ChunkReceipt, UploadService};

/// All transfer services over one repository and one storage provider,
/// sharing a single lock table.
#[derive(Debug, Clone)]
pub struct TransferServices {
    /// Transfer table and lifecycle.
    pub registry: Arc<TransferRegistry>,
    /// Chunk intake.
    pub uploads: Arc<UploadService>,
    /// Chunk-to-archive sealing.
    pub assembly: Arc<AssemblyEngine>,
    /// Public downloads.
    pub downloads: Arc<DownloadServer>,
    /// Per-transfer locks shared by the services above.
    pub locks: Arc<TransferLocks>,
}

impl TransferServices {
    /// Wires the services together.
    pub fn build(
        repo: Arc<dyn TransferRepository>,
        provider: Arc<dyn StorageProvider>,
        chunk_prefix: &str,
        archive_prefix: &str,
        config: TransferConfig,
    ) -> Self {
        let locks = Arc::new(TransferLocks::new());
        let chunks = ChunkStore::new(provider.clone(), chunk_prefix);
        let assembler = ChunkAssembler::new(chunks.clone(), provider.clone(), archive_prefix);
        let archives = ArchiveReader::new(provider.clone());
        let retain_chunks = config.retain_chunks_after_assembly;

        Self {
            uploads: Arc::new(UploadService::new(
                repo.clone(),
                chunks.clone(),
                locks.clone(),
            )),
            assembly: Arc::new(AssemblyEngine::new(
                repo.clone(),
                chunks.clone(),
                assembler.clone(),
                archives.clone(),
                locks.clone(),
                retain_chunks,
            )),
            downloads: Arc::new(DownloadServer::new(repo.clone(), provider, archives)),
            registry: Arc::new(TransferRegistry::new(
                repo,
                chunks,
                assembler,
                locks.clone(),
                config,
            )),
            locks,
        }
    }
}
