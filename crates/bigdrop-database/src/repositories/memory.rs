//! In-process transfer repository.
//!
//! Backs single-node deployments and the test suite. Each record sits in its
//! own `DashMap` slot, so compare-and-set and counter updates hold the slot's
//! write guard for their whole read-modify-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::{OwnerId, TransferId};
use bigdrop_entity::transfer::{Transfer, TransferState};

use super::{ReapCutoffs, TransferPatch, TransferRepository};

/// `DashMap`-backed registry.
#[derive(Debug, Default)]
pub struct MemoryTransferRepository {
    transfers: DashMap<TransferId, Transfer>,
}

impl MemoryTransferRepository {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, keep: impl Fn(&Transfer) -> bool) -> Vec<Transfer> {
        let mut found: Vec<Transfer> = self
            .transfers
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|t| t.created_at);
        found
    }
}

#[async_trait]
impl TransferRepository for MemoryTransferRepository {
    async fn insert(&self, transfer: &Transfer) -> AppResult<()> {
        self.transfers.insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TransferId) -> AppResult<Option<Transfer>> {
        Ok(self.transfers.get(&id).map(|t| t.value().clone()))
    }

    async fn list_by_owner(&self, owner: OwnerId) -> AppResult<Vec<Transfer>> {
        let mut owned = self.select(|t| t.owner_id == owner);
        owned.reverse();
        Ok(owned)
    }

    async fn update_details(
        &self,
        id: TransferId,
        patch: &TransferPatch,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Transfer>> {
        let Some(mut slot) = self.transfers.get_mut(&id) else {
            return Ok(None);
        };
        if !matches!(slot.state, TransferState::Pending | TransferState::Uploading) {
            return Ok(None);
        }
        if let Some(message) = &patch.message {
            slot.message = (!message.is_empty()).then(|| message.clone());
        }
        if let Some(expires_at) = patch.expires_at {
            slot.expires_at = expires_at;
        }
        slot.updated_at = now;
        Ok(Some(slot.clone()))
    }

    async fn transition(
        &self,
        id: TransferId,
        from: TransferState,
        to: TransferState,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.transfers.get_mut(&id) {
            Some(mut slot) if slot.state == from => {
                slot.state = to;
                slot.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_ready(
        &self,
        id: TransferId,
        archive_key: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.transfers.get_mut(&id) {
            Some(mut slot) if slot.state == TransferState::Assembling => {
                slot.state = TransferState::Ready;
                slot.archive_key = Some(archive_key.to_string());
                slot.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_downloads(&self, id: TransferId) -> AppResult<Option<i64>> {
        Ok(self.transfers.get_mut(&id).map(|mut slot| {
            slot.download_count += 1;
            slot.download_count
        }))
    }

    async fn touch(&self, id: TransferId, now: DateTime<Utc>) -> AppResult<()> {
        if let Some(mut slot) = self.transfers.get_mut(&id) {
            slot.last_activity_at = now;
        }
        Ok(())
    }

    async fn delete(&self, id: TransferId) -> AppResult<bool> {
        Ok(self.transfers.remove(&id).is_some())
    }

    async fn find_reapable(&self, cutoffs: &ReapCutoffs) -> AppResult<Vec<Transfer>> {
        use TransferState::*;
        Ok(self.select(|t| match t.state {
            Cancelled => true,
            Pending | Uploading => {
                t.last_activity_at < cutoffs.idle_before || t.expires_at < cutoffs.expired_before
            }
            Ready | Expired => t.expires_at < cutoffs.expired_before,
            Assembling => false,
        }))
    }

    async fn find_stalled_assemblies(&self, before: DateTime<Utc>) -> AppResult<Vec<Transfer>> {
        Ok(self.select(|t| t.state == TransferState::Assembling && t.updated_at < before))
    }
}
