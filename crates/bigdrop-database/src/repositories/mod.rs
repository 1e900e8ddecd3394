//! Transfer repository trait and its implementations.

pub mod memory;
pub mod transfer;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::{OwnerId, TransferId};
use bigdrop_entity::transfer::{Transfer, TransferState};

pub use memory::MemoryTransferRepository;
pub use transfer::PgTransferRepository;

/// Owner-editable fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TransferPatch {
    /// New message; `Some("")` clears it.
    pub message: Option<String>,
    /// New absolute expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Time bounds used to select transfers for physical deletion.
#[derive(Debug, Clone, Copy)]
pub struct ReapCutoffs {
    /// `Pending`/`Uploading` transfers idle since before this are stale.
    pub idle_before: DateTime<Utc>,
    /// Transfers whose expiry is before this are past retention.
    pub expired_before: DateTime<Utc>,
}

/// Persistence for transfer records.
///
/// State changes go through compare-and-set methods so that a caller's
/// check of the current state and its write are a single atomic step.
#[async_trait]
pub trait TransferRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new transfer.
    async fn insert(&self, transfer: &Transfer) -> AppResult<()>;

    /// Find a transfer by id.
    async fn find_by_id(&self, id: TransferId) -> AppResult<Option<Transfer>>;

    /// All transfers of `owner`, newest first.
    async fn list_by_owner(&self, owner: OwnerId) -> AppResult<Vec<Transfer>>;

    /// Apply `patch` if the transfer is still `Pending` or `Uploading`.
    ///
    /// Returns `None` when the transfer is missing or in another state.
    async fn update_details(
        &self,
        id: TransferId,
        patch: &TransferPatch,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Transfer>>;

    /// Move `from → to` only if the stored state is still `from`.
    async fn transition(
        &self,
        id: TransferId,
        from: TransferState,
        to: TransferState,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Move `Assembling → Ready`, recording the archive key.
    async fn mark_ready(
        &self,
        id: TransferId,
        archive_key: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Atomically add one to the download counter, returning the new value.
    async fn increment_downloads(&self, id: TransferId) -> AppResult<Option<i64>>;

    /// Record chunk activity.
    async fn touch(&self, id: TransferId, now: DateTime<Utc>) -> AppResult<()>;

    /// Remove the record. Returns whether it existed.
    async fn delete(&self, id: TransferId) -> AppResult<bool>;

    /// Cancelled, stale, or expired-past-retention transfers.
    async fn find_reapable(&self, cutoffs: &ReapCutoffs) -> AppResult<Vec<Transfer>>;

    /// `Assembling` transfers untouched since `before` (orphaned by a crash).
    async fn find_stalled_assemblies(&self, before: DateTime<Utc>) -> AppResult<Vec<Transfer>>;
}
