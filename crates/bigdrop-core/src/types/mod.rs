//! Core type definitions used across the BigDrop workspace.

pub mod id;
pub mod response;

pub use id::*;
pub use response::{ApiErrorBody, ApiErrorResponse, ApiResponse};
