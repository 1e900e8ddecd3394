//! Transfer entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use bigdrop_core::error::AppError;
use bigdrop_core::result::AppResult;
use bigdrop_core::types::id::{OwnerId, TransferId};

use super::state::TransferState;

/// Number of chunks needed to carry `size` bytes in `max_chunk_size` slices.
pub fn expected_chunk_count(size: u64, max_chunk_size: u64) -> u32 {
    if max_chunk_size == 0 {
        return 0;
    }
    size.div_ceil(max_chunk_size) as u32
}

/// One file-sharing operation and its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    /// Unique transfer identifier.
    pub id: TransferId,
    /// Caller that created the transfer.
    pub owner_id: OwnerId,
    /// Declared total byte count of the archive.
    pub size: i64,
    /// Chunk size negotiated at creation.
    pub max_chunk_size: i64,
    /// `ceil(size / max_chunk_size)`.
    pub expected_chunk_count: i32,
    /// Optional free text shown on the share page.
    pub message: Option<String>,
    /// Absolute expiry deadline.
    pub expires_at: DateTime<Utc>,
    /// Stored lifecycle state. Use [`Transfer::effective_state`] for reads.
    pub state: TransferState,
    /// Number of completed download starts.
    pub download_count: i64,
    /// Storage key of the sealed archive, set once `Ready`.
    pub archive_key: Option<String>,
    /// When the transfer was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
    /// When the last chunk was accepted.
    pub last_activity_at: DateTime<Utc>,
}

impl Transfer {
    /// Build a fresh `Pending` transfer.
    pub fn new(
        owner_id: OwnerId,
        size: u64,
        max_chunk_size: u64,
        message: Option<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransferId::new(),
            owner_id,
            size: size as i64,
            max_chunk_size: max_chunk_size as i64,
            expected_chunk_count: expected_chunk_count(size, max_chunk_size) as i32,
            message,
            expires_at,
            state: TransferState::Pending,
            download_count: 0,
            archive_key: None,
            created_at: now,
            updated_at: now,
            last_activity_at: now,
        }
    }

    /// Declared size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.size.max(0) as u64
    }

    /// Negotiated chunk size in bytes.
    pub fn chunk_size_bytes(&self) -> u64 {
        self.max_chunk_size.max(0) as u64
    }

    /// Expected number of chunks.
    pub fn chunk_count(&self) -> u32 {
        self.expected_chunk_count.max(0) as u32
    }

    /// Whether `caller` owns this transfer.
    pub fn is_owned_by(&self, caller: &OwnerId) -> bool {
        self.owner_id == *caller
    }

    /// Exact byte length of chunk `index`, or `None` when out of range.
    ///
    /// Every chunk is `max_chunk_size` long except the last, which carries
    /// the remainder.
    pub fn expected_chunk_len(&self, index: u32) -> Option<u64> {
        let count = self.chunk_count();
        if index >= count {
            return None;
        }
        let chunk = self.chunk_size_bytes();
        if index + 1 < count {
            Some(chunk)
        } else {
            Some(self.size_bytes() - chunk * u64::from(count - 1))
        }
    }

    /// Apply a lifecycle transition, rejecting illegal moves.
    pub fn transition(&mut self, next: TransferState, now: DateTime<Utc>) -> AppResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(AppError::invalid_state(format!(
                "Transfer {} cannot move from {} to {}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// State as observed at `now`, applying expiry lazily.
    ///
    /// `Assembling` is never reported as expired; the transfer expires once
    /// it reaches `Ready`.
    pub fn effective_state(&self, now: DateTime<Utc>) -> TransferState {
        let expirable = matches!(
            self.state,
            TransferState::Pending | TransferState::Uploading | TransferState::Ready
        );
        if expirable && now >= self.expires_at {
            TransferState::Expired
        } else {
            self.state
        }
    }

    /// Copy of this transfer with its state replaced by the effective state.
    pub fn observed(mut self, now: DateTime<Utc>) -> Self {
        self.state = self.effective_state(now);
        self
    }

    /// Whether an expired transfer has outlived its retention window.
    pub fn is_past_retention(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        self.effective_state(now) == TransferState::Expired && now >= self.expires_at + retention
    }
}
