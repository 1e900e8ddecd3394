//! # bigdrop-service
//!
//! Business logic for BigDrop transfers. Services receive their
//! repository and storage dependencies at construction time as `Arc`s and
//! share one per-transfer lock table, see [`transfer::TransferServices`].

pub mod context;
pub mod transfer;

pub use context::RequestContext;
pub use transfer::{
    AssemblyEngine, DownloadServer, TransferLocks, TransferRegistry, TransferServices,
    UploadService,
};
