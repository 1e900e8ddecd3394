//! Core traits defined in `bigdrop-core` and implemented by other crates.

pub mod storage;

pub use storage::{ByteStream, SyncReader, StorageObjectMeta, StorageProvider};
