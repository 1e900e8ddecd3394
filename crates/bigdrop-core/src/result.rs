//! Convenience result type alias for BigDrop.

use crate::error::AppError;

/// A specialized `Result` type for BigDrop operations.
pub type AppResult<T> = Result<T, AppError>;
