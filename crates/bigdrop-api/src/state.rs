//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use bigdrop_auth::JwtDecoder;
use bigdrop_core::config::AppConfig;
use bigdrop_core::traits::storage::StorageProvider;
use bigdrop_service::transfer::TransferServices;
use bigdrop_service::{AssemblyEngine, DownloadServer, TransferRegistry, UploadService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Bearer token validator
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Storage holding chunks and archives
    pub storage: Arc<dyn StorageProvider>,
    /// Transfer table and lifecycle
    pub registry: Arc<TransferRegistry>,
    /// Chunk intake
    pub uploads: Arc<UploadService>,
    /// Chunk-to-archive sealing
    pub assembly: Arc<AssemblyEngine>,
    /// Public downloads
    pub downloads: Arc<DownloadServer>,
}

impl AppState {
    /// Assemble the state from configuration and wired services.
    pub fn new(
        config: Arc<AppConfig>,
        jwt_decoder: Arc<JwtDecoder>,
        storage: Arc<dyn StorageProvider>,
        services: TransferServices,
    ) -> Self {
        Self {
            config,
            jwt_decoder,
            storage,
            registry: services.registry,
            uploads: services.uploads,
            assembly: services.assembly,
            downloads: services.downloads,
        }
    }
}
