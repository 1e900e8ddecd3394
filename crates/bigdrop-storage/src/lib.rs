//! # bigdrop-storage
//!
//! Byte storage for BigDrop: the local filesystem provider, per-index chunk
//! storage, in-order chunk assembly and zip archive access.

pub mod archive;
pub mod chunked;
pub mod providers;

pub use archive::{ArchiveReader, EntryStream};
pub use chunked::{ChunkAssembler, ChunkStore};
pub use providers::LocalStorageProvider;
