//! PostgreSQL transfer repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bigdrop_core::error::{AppError, ErrorKind};
use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::{OwnerId, TransferId};
use bigdrop_entity::transfer::{Transfer, TransferState};

use super::{ReapCutoffs, TransferPatch, TransferRepository};

/// Repository over the `transfers` table.
#[derive(Debug, Clone)]
pub struct PgTransferRepository {
    pool: PgPool,
}

impl PgTransferRepository {
    /// Create a new transfer repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

#[async_trait]
impl TransferRepository for PgTransferRepository {
    async fn insert(&self, transfer: &Transfer) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO transfers (id, owner_id, size, max_chunk_size, expected_chunk_count, \
             message, expires_at, state, download_count, archive_key, created_at, updated_at, \
             last_activity_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(transfer.id)
        .bind(transfer.owner_id)
        .bind(transfer.size)
        .bind(transfer.max_chunk_size)
        .bind(transfer.expected_chunk_count)
        .bind(&transfer.message)
        .bind(transfer.expires_at)
        .bind(transfer.state)
        .bind(transfer.download_count)
        .bind(&transfer.archive_key)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .bind(transfer.last_activity_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert transfer"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: TransferId) -> AppResult<Option<Transfer>> {
        sqlx::query_as::<_, Transfer>("SELECT * FROM transfers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find transfer"))
    }

    async fn list_by_owner(&self, owner: OwnerId) -> AppResult<Vec<Transfer>> {
        sqlx::query_as::<_, Transfer>(
            "SELECT * FROM transfers WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list transfers"))
    }

    async fn update_details(
        &self,
        id: TransferId,
        patch: &TransferPatch,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Transfer>> {
        sqlx::query_as::<_, Transfer>(
            "UPDATE transfers SET \
             message = CASE WHEN $2::text IS NULL THEN message ELSE NULLIF($2, '') END, \
             expires_at = COALESCE($3, expires_at), \
             updated_at = $4 \
             WHERE id = $1 AND state IN ('pending', 'uploading') RETURNING *",
        )
        .bind(id)
        .bind(&patch.message)
        .bind(patch.expires_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to update transfer"))
    }

    async fn transition(
        &self,
        id: TransferId,
        from: TransferState,
        to: TransferState,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE transfers SET state = $3, updated_at = $4 WHERE id = $1 AND state = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to change transfer state"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_ready(
        &self,
        id: TransferId,
        archive_key: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE transfers SET state = 'ready', archive_key = $2, updated_at = $3 \
             WHERE id = $1 AND state = 'assembling'",
        )
        .bind(id)
        .bind(archive_key)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to seal transfer"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_downloads(&self, id: TransferId) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE transfers SET download_count = download_count + 1 \
             WHERE id = $1 RETURNING download_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to increment download count"))
    }

    async fn touch(&self, id: TransferId, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE transfers SET last_activity_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to record transfer activity"))?;
        Ok(())
    }

    async fn delete(&self, id: TransferId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM transfers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to delete transfer"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_reapable(&self, cutoffs: &ReapCutoffs) -> AppResult<Vec<Transfer>> {
        sqlx::query_as::<_, Transfer>(
            "SELECT * FROM transfers \
             WHERE state = 'cancelled' \
             OR (state IN ('pending', 'uploading') AND last_activity_at < $1) \
             OR (state IN ('pending', 'uploading', 'ready', 'expired') AND expires_at < $2) \
             ORDER BY created_at",
        )
        .bind(cutoffs.idle_before)
        .bind(cutoffs.expired_before)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to find reapable transfers"))
    }

    async fn find_stalled_assemblies(&self, before: DateTime<Utc>) -> AppResult<Vec<Transfer>> {
        sqlx::query_as::<_, Transfer>(
            "SELECT * FROM transfers WHERE state = 'assembling' AND updated_at < $1",
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to find stalled assemblies"))
    }
}
