//! Transfer limits and lifetimes.

use serde::{Deserialize, Serialize};

/// Limits applied to every transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Server-chosen chunk size handed to clients on create (default 5 MiB).
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size_bytes: u64,
    /// Ceiling on the declared size of a transfer (default 5 GiB).
    #[serde(default = "default_max_transfer_size")]
    pub max_transfer_size_bytes: u64,
    /// Expiry class applied when a create request carries none.
    #[serde(default = "default_expiry")]
    pub default_expiry: String,
    /// Hours an `Uploading` transfer may sit idle before the reaper drops it.
    #[serde(default = "default_upload_session_ttl")]
    pub upload_session_ttl_hours: u64,
    /// Hours an expired transfer stays visible before it reads as not found.
    #[serde(default = "default_expired_retention")]
    pub expired_retention_hours: u64,
    /// Keep chunk files after a successful assembly.
    #[serde(default)]
    pub retain_chunks_after_assembly: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_chunk_size_bytes: default_max_chunk_size(),
            max_transfer_size_bytes: default_max_transfer_size(),
            default_expiry: default_expiry(),
            upload_session_ttl_hours: default_upload_session_ttl(),
            expired_retention_hours: default_expired_retention(),
            retain_chunks_after_assembly: false,
        }
    }
}

fn default_max_chunk_size() -> u64 {
    5 * 1024 * 1024
}

fn default_max_transfer_size() -> u64 {
    5 * 1024 * 1024 * 1024
}

fn default_expiry() -> String {
    "7d".to_string()
}

fn default_upload_session_ttl() -> u64 {
    4
}

fn default_expired_retention() -> u64 {
    24
}
