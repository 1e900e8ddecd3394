//! Registry schema migrations.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use bigdrop_core::error::{AppError, ErrorKind};
use bigdrop_core::result::AppResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the `transfers` schema up to date.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let pending = MIGRATOR.iter().count();
    info!(migrations = pending, "Applying registry migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to run migrations: {e}"),
            e,
        )
    })
}
