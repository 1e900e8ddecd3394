//! # bigdrop-api
//!
//! HTTP API layer for BigDrop built on Axum.
//!
//! Provides the transfer endpoints, middleware (CORS, logging, timeouts,
//! body limits), extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
