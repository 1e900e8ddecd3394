//! # bigdrop-database
//!
//! Transfer registry persistence. [`repositories::TransferRepository`] is the
//! seam; PostgreSQL and in-memory implementations sit behind it and are
//! selected by `database.provider`.

pub mod connection;
pub mod migration;
pub mod repositories;

use std::sync::Arc;

use tracing::info;

use bigdrop_core::config::DatabaseConfig;
use bigdrop_core::result::AppResult;

pub use connection::DatabasePool;
pub use repositories::{
    MemoryTransferRepository, PgTransferRepository, ReapCutoffs, TransferPatch,
    TransferRepository,
};

/// Open the configured registry backend, running migrations for PostgreSQL.
pub async fn open_transfer_repository(
    config: &DatabaseConfig,
) -> AppResult<Arc<dyn TransferRepository>> {
    if config.is_memory() {
        info!("Using in-memory transfer registry");
        return Ok(Arc::new(MemoryTransferRepository::new()));
    }

    let pool = DatabasePool::connect(config).await?;
    migration::run_migrations(pool.pool()).await?;
    Ok(Arc::new(PgTransferRepository::new(pool.into_pool())))
}
