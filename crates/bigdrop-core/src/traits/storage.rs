//! Storage provider trait for chunk and archive persistence.

use std::io::{Read, Seek};
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageObjectMeta {
    /// Path within the storage provider.
    pub path: String,
    /// Final path component.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modified timestamp.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
    /// Whether this is a directory.
    pub is_directory: bool,
}

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Blocking, seekable reader handed to container parsers.
pub trait SyncReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> SyncReader for T {}

/// Durable key/value byte storage.
///
/// Keys are `/`-separated relative paths. A completed `write` is visible to
/// every later `read`; a failed or interrupted write never leaves a partial
/// object behind.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Read an object and return its byte stream.
    async fn read(&self, path: &str) -> AppResult<ByteStream>;

    /// Read an object into memory.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to the given path, replacing any existing object.
    async fn write(&self, path: &str, data: Bytes) -> AppResult<()>;

    /// Write a byte stream to the given path and return the bytes written.
    async fn write_stream(&self, path: &str, stream: ByteStream) -> AppResult<u64>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Delete a directory and all its contents. Missing directories succeed.
    async fn delete_dir(&self, path: &str) -> AppResult<()>;

    /// Check whether an object or directory exists.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Size of an object in bytes.
    async fn size(&self, path: &str) -> AppResult<u64>;

    /// List the direct children of a directory. A missing directory is empty.
    async fn list(&self, path: &str) -> AppResult<Vec<StorageObjectMeta>>;

    /// Open a blocking random-access reader.
    ///
    /// Callers must only use the handle inside `spawn_blocking`.
    async fn open_sync(&self, path: &str) -> AppResult<Box<dyn SyncReader>>;
}
