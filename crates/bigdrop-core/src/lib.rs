//! # bigdrop-core
//!
//! Core crate for BigDrop. Contains the unified error system, configuration
//! schemas, typed identifiers, the storage provider trait and the response
//! envelope shared by every other crate.
//!
//! This crate has **no** internal dependencies on other BigDrop crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
