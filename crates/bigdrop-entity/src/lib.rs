//! # bigdrop-entity
//!
//! Domain entity models for BigDrop. [`transfer::Transfer`] is the single
//! persisted row; [`archive::FileEntry`] is derived from a sealed archive and
//! never stored.

pub mod archive;
pub mod transfer;

pub use archive::{FileEntry, FileEntryId};
pub use transfer::{Expiry, ExpiryClass, Transfer, TransferState};
