//! Local filesystem storage provider.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use bigdrop_core::error::{AppError, ErrorKind};
use bigdrop_core::result::AppResult;
use bigdrop_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider, SyncReader};

/// Local filesystem storage provider.
///
/// Writes land in a sibling `.part` file first and are renamed into place,
/// so a crashed or failed write never leaves a truncated object under the
/// final key.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Create a provider rooted at `root_path`, creating the directory.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Resolve a key to a path under the root, refusing to escape it.
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AppError::validation(format!("Invalid storage key: {path}")));
        }
        Ok(self.root.join(relative))
    }

    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn staging_path(target: &Path) -> PathBuf {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.part", Uuid::new_v4().simple()));
        target.with_file_name(name)
    }

    async fn commit(staging: &Path, target: &Path, path: &str) -> AppResult<()> {
        if let Err(e) = fs::rename(staging, target).await {
            let _ = fs::remove_file(staging).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to commit write: {path}"),
                e,
            ));
        }
        Ok(())
    }
}

fn io_error(action: &str, path: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Object not found: {path}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {action}: {path}"), e)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(path)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| io_error("open", path, e))?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(path)?;
        let data = fs::read(&full_path)
            .await
            .map_err(|e| io_error("read", path, e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        let staging = Self::staging_path(&full_path);
        let written: std::io::Result<()> = async {
            let mut file = fs::File::create(&staging).await?;
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&staging).await;
            return Err(io_error("write", path, e));
        }
        Self::commit(&staging, &full_path, path).await?;

        debug!(path, bytes = data.len(), "Wrote object");
        Ok(())
    }

    async fn write_stream(&self, path: &str, mut stream: ByteStream) -> AppResult<u64> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        let staging = Self::staging_path(&full_path);
        let written: std::io::Result<u64> = async {
            let mut file = fs::File::create(&staging).await?;
            let mut total = 0u64;
            while let Some(piece) = stream.next().await {
                let piece = piece?;
                total += piece.len() as u64;
                file.write_all(&piece).await?;
            }
            file.sync_all().await?;
            Ok(total)
        }
        .await;

        let total = match written {
            Ok(total) => total,
            Err(e) => {
                let _ = fs::remove_file(&staging).await;
                return Err(io_error("write stream", path, e));
            }
        };
        Self::commit(&staging, &full_path, path).await?;

        debug!(path, bytes = total, "Wrote object from stream");
        Ok(total)
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", path, e)),
        }
    }

    async fn delete_dir(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_dir_all(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete directory", path, e)),
        }
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        fs::try_exists(&full_path)
            .await
            .map_err(|e| io_error("stat", path, e))
    }

    async fn size(&self, path: &str) -> AppResult<u64> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| io_error("stat", path, e))?;
        Ok(meta.len())
    }

    async fn list(&self, path: &str) -> AppResult<Vec<StorageObjectMeta>> {
        let full_path = self.resolve(path)?;
        let mut dir = match fs::read_dir(&full_path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list", path, e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| io_error("list", path, e))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(|e| io_error("stat", path, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let entry_path = if path.is_empty() || path == "/" {
                name.clone()
            } else {
                format!("{}/{}", path.trim_end_matches('/'), name)
            };

            entries.push(StorageObjectMeta {
                path: entry_path,
                name,
                size_bytes: meta.len(),
                last_modified: meta.modified().ok().map(chrono::DateTime::<chrono::Utc>::from),
                is_directory: meta.is_dir(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn open_sync(&self, path: &str) -> AppResult<Box<dyn SyncReader>> {
        let full_path = self.resolve(path)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| io_error("open", path, e))?;
        Ok(Box::new(file.into_std().await))
    }
}
