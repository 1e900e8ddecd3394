//! Public download side: share metadata, whole-archive and single-file streams.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use bigdrop_core::error::AppError;
use bigdrop_core::result::AppResult;
use bigdrop_core::traits::storage::{ByteStream, StorageProvider};
use bigdrop_core::types::id::TransferId;
use bigdrop_database::repositories::TransferRepository;
use bigdrop_entity::archive::{FileEntry, FileEntryId};
use bigdrop_entity::transfer::{Transfer, TransferState};
use bigdrop_storage::ArchiveReader;

/// Public view of a ready transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedTransfer {
    /// The transfer.
    pub transfer: Transfer,
    /// Files in its archive.
    pub entries: Vec<FileEntry>,
}

/// The whole archive, opened for streaming.
pub struct ArchiveDownload {
    /// Transfer being downloaded.
    pub transfer: Transfer,
    /// Suggested file name.
    pub file_name: String,
    /// Archive length in bytes.
    pub size: u64,
    /// Archive bytes.
    pub stream: ByteStream,
}

/// One file out of the archive, opened for streaming.
pub struct FileDownload {
    /// The entry being downloaded.
    pub entry: FileEntry,
    /// Uncompressed entry bytes.
    pub stream: ByteStream,
}

impl std::fmt::Debug for ArchiveDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveDownload")
            .field("transfer_id", &self.transfer.id)
            .field("file_name", &self.file_name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for FileDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDownload")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

/// Serves sealed archives to anyone holding the share link.
#[derive(Clone)]
pub struct DownloadServer {
    repo: Arc<dyn TransferRepository>,
    provider: Arc<dyn StorageProvider>,
    archives: ArchiveReader,
}

impl std::fmt::Debug for DownloadServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadServer").finish()
    }
}

impl DownloadServer {
    /// Creates a new download server.
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        provider: Arc<dyn StorageProvider>,
        archives: ArchiveReader,
    ) -> Self {
        Self {
            repo,
            provider,
            archives,
        }
    }

    /// Loads a transfer that may be downloaded, with its archive key.
    ///
    /// Expiry is checked before readiness, so an expired upload reports
    /// `Expired` rather than `NotReady`.
    async fn readable(&self, id: TransferId) -> AppResult<(Transfer, String)> {
        let transfer = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Transfer {id} not found")))?
            .observed(Utc::now());

        match transfer.state {
            TransferState::Cancelled => {
                Err(AppError::not_found(format!("Transfer {id} not found")))
            }
            TransferState::Expired => Err(AppError::expired(format!("Transfer {id} has expired"))),
            TransferState::Ready => match transfer.archive_key.clone() {
                Some(key) => Ok((transfer, key)),
                None => Err(AppError::not_ready(format!("Transfer {id} has no archive"))),
            },
            other => Err(AppError::not_ready(format!(
                "Transfer {id} is not ready for download ({other})"
            ))),
        }
    }

    /// Public metadata and file listing of a ready transfer.
    pub async fn share_info(&self, id: TransferId) -> AppResult<SharedTransfer> {
        let (transfer, key) = self.readable(id).await?;
        let entries = self.archives.entries(&key, id).await?;
        Ok(SharedTransfer { transfer, entries })
    }

    /// Streams the whole archive and counts the download.
    pub async fn download_archive(&self, id: TransferId) -> AppResult<ArchiveDownload> {
        let (mut transfer, key) = self.readable(id).await?;
        let size = self.provider.size(&key).await?;
        let stream = self.provider.read(&key).await?;

        transfer.download_count = self.count(id).await?;
        info!(transfer_id = %id, bytes = size, downloads = transfer.download_count, "Archive download started");

        Ok(ArchiveDownload {
            file_name: format!("bigdrop-{id}.zip"),
            transfer,
            size,
            stream,
        })
    }

    /// Streams a single archive entry and counts the download.
    pub async fn download_file(&self, file_id: FileEntryId) -> AppResult<FileDownload> {
        let (_, key) = self.readable(file_id.transfer_id).await?;
        let opened = self.archives.open_entry(&key, file_id).await?;

        let downloads = self.count(file_id.transfer_id).await?;
        info!(
            transfer_id = %file_id.transfer_id,
            file = %opened.entry.name,
            bytes = opened.entry.size,
            downloads,
            "File download started"
        );

        Ok(FileDownload {
            entry: opened.entry,
            stream: opened.stream,
        })
    }

    async fn count(&self, id: TransferId) -> AppResult<i64> {
        self.repo
            .increment_downloads(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Transfer {id} not found")))
    }
}
