//! Sealed archive access.

pub mod reader;

pub use reader::{ArchiveReader, EntryStream};
