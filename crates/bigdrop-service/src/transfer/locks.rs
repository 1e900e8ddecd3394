//! Per-transfer mutual exclusion.
//!
//! Chunk writes take the shared side so different indices of one transfer
//! proceed in parallel. State-changing operations (cancel, delete, the
//! `Uploading → Assembling` switch) take the exclusive side. Distinct
//! transfers never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use bigdrop_core::types::id::TransferId;

type LockTable = DashMap<TransferId, Arc<RwLock<()>>>;

/// Lazily created read/write lock per transfer id.
///
/// An entry lives only while someone holds or waits on it; the last guard
/// to drop removes it, so ids that never name a transfer leave nothing
/// behind.
#[derive(Debug, Default)]
pub struct TransferLocks {
    locks: Arc<LockTable>,
}

/// Held lock on one transfer. Dropping it releases the lock.
#[must_use = "the transfer is unlocked as soon as the guard is dropped"]
pub struct TransferGuard<G> {
    guard: Option<G>,
    id: TransferId,
    table: Arc<LockTable>,
}

/// Shared side of a transfer lock.
pub type SharedGuard = TransferGuard<OwnedRwLockReadGuard<()>>;

/// Exclusive side of a transfer lock.
pub type ExclusiveGuard = TransferGuard<OwnedRwLockWriteGuard<()>>;

impl<G> Drop for TransferGuard<G> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table's own reference left means no holder and no waiter.
        self.table
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl<G> std::fmt::Debug for TransferGuard<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferGuard").field("id", &self.id).finish()
    }
}

impl TransferLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: TransferId) -> Arc<RwLock<()>> {
        self.locks.entry(id).or_default().clone()
    }

    fn wrap<G>(&self, id: TransferId, guard: G) -> TransferGuard<G> {
        TransferGuard {
            guard: Some(guard),
            id,
            table: Arc::clone(&self.locks),
        }
    }

    /// Acquire the shared side.
    pub async fn shared(&self, id: TransferId) -> SharedGuard {
        let guard = self.lock_for(id).read_owned().await;
        self.wrap(id, guard)
    }

    /// Acquire the exclusive side.
    pub async fn exclusive(&self, id: TransferId) -> ExclusiveGuard {
        let guard = self.lock_for(id).write_owned().await;
        self.wrap(id, guard)
    }

    /// Number of transfers currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no transfer is locked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
