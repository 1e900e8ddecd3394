//! Transfer lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a transfer.
///
/// ```text
/// Pending ─► Uploading ─► Assembling ─► Ready ─► Expired
///               │  ▲           │
///               │  └───────────┘ (assembly failed)
///               ├─► Cancelled
///               └─► Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Record allocated, not yet accepting chunks.
    Pending,
    /// Accepting chunks.
    Uploading,
    /// Chunks are being concatenated into the archive.
    Assembling,
    /// Archive sealed and downloadable.
    Ready,
    /// Cancelled by the owner.
    Cancelled,
    /// Past its expiry.
    Expired,
}

impl TransferState {
    /// Return the state as a string for database storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Assembling => "assembling",
            Self::Ready => "ready",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// `Cancelled` and `Expired` accept no further operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }

    /// Whether `self → next` is a legal transition.
    ///
    /// `Assembling → Uploading` is the revert taken when assembly fails.
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        matches!(
            (self, next),
            (Pending, Uploading)
                | (Uploading, Assembling)
                | (Uploading, Cancelled)
                | (Uploading, Expired)
                | (Assembling, Ready)
                | (Assembling, Uploading)
                | (Ready, Expired)
        )
    }
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
