//! Storage configuration.

use serde::{Deserialize, Serialize};

/// Where chunks and sealed archives live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all runtime data.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Key prefix under which chunks are stored.
    #[serde(default = "default_chunk_prefix")]
    pub chunk_prefix: String,
    /// Key prefix under which sealed archives are stored.
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            chunk_prefix: default_chunk_prefix(),
            archive_prefix: default_archive_prefix(),
        }
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_chunk_prefix() -> String {
    "_chunks".to_string()
}

fn default_archive_prefix() -> String {
    "_archives".to_string()
}
