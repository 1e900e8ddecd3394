//! Built-in job implementations.

pub mod reaper;

pub use reaper::{ReapReport, TransferReaper};
