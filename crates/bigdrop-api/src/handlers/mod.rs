//! Route handlers organized by domain.

pub mod download;
pub mod health;
pub mod transfer;
