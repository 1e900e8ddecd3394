//! Zip container reader for sealed archives.
//!
//! The zip central directory gives random access to each entry, so a
//! single-file download reads only that entry's bytes. Parsing is blocking
//! and runs on the blocking pool; entry bytes are handed back through a
//! bounded channel.

use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use zip::ZipArchive;
use zip::result::ZipError;

use bigdrop_core::error::{AppError, ErrorKind};
use bigdrop_core::result::AppResult;
use bigdrop_core::traits::storage::{ByteStream, StorageProvider, SyncReader};
use bigdrop_core::types::id::TransferId;
use bigdrop_entity::archive::{FileEntry, FileEntryId};

const READ_BUFFER: usize = 64 * 1024;
const CHANNEL_DEPTH: usize = 8;

/// A single archive entry opened for streaming.
pub struct EntryStream {
    /// The entry being streamed.
    pub entry: FileEntry,
    /// Uncompressed entry bytes.
    pub stream: ByteStream,
}

impl std::fmt::Debug for EntryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStream")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

/// Reads entries out of sealed archives.
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    provider: Arc<dyn StorageProvider>,
}

impl ArchiveReader {
    /// Create a reader over the provider holding the archives.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// List the file entries of the archive at `key`. Directories are skipped.
    pub async fn entries(&self, key: &str, transfer_id: TransferId) -> AppResult<Vec<FileEntry>> {
        let reader = self.provider.open_sync(key).await?;
        tokio::task::spawn_blocking(move || list_entries(reader, transfer_id))
            .await
            .map_err(|e| AppError::internal(format!("Archive listing task failed: {e}")))?
    }

    /// Open one entry for streaming.
    ///
    /// Fails with `NotFound` if the index is past the end of the directory
    /// or names a directory.
    pub async fn open_entry(&self, key: &str, id: FileEntryId) -> AppResult<EntryStream> {
        let reader = self.provider.open_sync(key).await?;
        let (entry_tx, entry_rx) = oneshot::channel();
        let (data_tx, data_rx) = mpsc::channel(CHANNEL_DEPTH);

        tokio::task::spawn_blocking(move || stream_entry(reader, id, entry_tx, data_tx));

        let entry = entry_rx
            .await
            .map_err(|_| AppError::internal("Archive reader stopped before opening entry"))??;

        let stream = futures::stream::unfold(data_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(EntryStream {
            entry,
            stream: Box::pin(stream),
        })
    }
}

fn zip_error(err: ZipError) -> AppError {
    match err {
        ZipError::Io(io)
            if matches!(
                io.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::InvalidData
                    | std::io::ErrorKind::InvalidInput
            ) =>
        {
            AppError::with_source(ErrorKind::InvalidArchive, "Archive is truncated or corrupt", io)
        }
        ZipError::Io(io) => AppError::with_source(ErrorKind::Storage, "Failed to read archive", io),
        ZipError::FileNotFound => AppError::not_found("File entry not found in archive"),
        other => AppError::with_source(
            ErrorKind::InvalidArchive,
            format!("Archive is not a readable zip container: {other}"),
            other,
        ),
    }
}

/// Parse the central directory and collect the non-directory entries.
pub fn list_entries(
    reader: Box<dyn SyncReader>,
    transfer_id: TransferId,
) -> AppResult<Vec<FileEntry>> {
    let mut archive = ZipArchive::new(reader).map_err(zip_error)?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive.by_index(index).map_err(zip_error)?;
        if file.is_dir() {
            continue;
        }
        entries.push(FileEntry::new(
            FileEntryId::new(transfer_id, index),
            file.name(),
            file.size(),
        ));
    }
    Ok(entries)
}

fn stream_entry(
    reader: Box<dyn SyncReader>,
    id: FileEntryId,
    entry_tx: oneshot::Sender<AppResult<FileEntry>>,
    data_tx: mpsc::Sender<Result<Bytes, std::io::Error>>,
) {
    let mut archive = match ZipArchive::new(reader) {
        Ok(archive) => archive,
        Err(e) => {
            let _ = entry_tx.send(Err(zip_error(e)));
            return;
        }
    };
    if id.index >= archive.len() {
        let _ = entry_tx.send(Err(AppError::not_found(format!("File {id} not found"))));
        return;
    }
    let mut file = match archive.by_index(id.index) {
        Ok(file) if !file.is_dir() => file,
        Ok(_) => {
            let _ = entry_tx.send(Err(AppError::not_found(format!("File {id} not found"))));
            return;
        }
        Err(e) => {
            let _ = entry_tx.send(Err(zip_error(e)));
            return;
        }
    };

    let entry = FileEntry::new(id, file.name(), file.size());
    if entry_tx.send(Ok(entry)).is_err() {
        return;
    }

    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if data_tx
                    .blocking_send(Ok(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                let _ = data_tx.blocking_send(Err(e));
                break;
            }
        }
    }
}
