//! Entries recovered from a sealed archive.

pub mod entry;

pub use entry::{FileEntry, FileEntryId};
