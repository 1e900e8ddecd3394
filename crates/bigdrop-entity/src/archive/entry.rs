//! Logical files inside a sealed archive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use bigdrop_core::types::id::TransferId;

/// Opaque handle for one archive entry: `"{transfer_id}.{entry_index}"`.
///
/// The transfer id is embedded so a download by file id alone can find the
/// archive without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileEntryId {
    /// Owning transfer.
    pub transfer_id: TransferId,
    /// Index of the entry in the archive's central directory.
    pub index: usize,
}

impl FileEntryId {
    /// Build an entry id.
    pub fn new(transfer_id: TransferId, index: usize) -> Self {
        Self { transfer_id, index }
    }
}

impl fmt::Display for FileEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.transfer_id, self.index)
    }
}

impl FromStr for FileEntryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (transfer, index) = s
            .rsplit_once('.')
            .ok_or_else(|| format!("malformed file id '{s}'"))?;
        let transfer_id = transfer
            .parse::<TransferId>()
            .map_err(|_| format!("malformed file id '{s}'"))?;
        let index = index
            .parse::<usize>()
            .map_err(|_| format!("malformed file id '{s}'"))?;
        Ok(Self { transfer_id, index })
    }
}

impl TryFrom<String> for FileEntryId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FileEntryId> for String {
    fn from(value: FileEntryId) -> Self {
        value.to_string()
    }
}

/// A file recovered from the archive's container directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Handle used by the single-file download route.
    pub id: FileEntryId,
    /// Path of the file inside the archive.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Lower-cased extension without the dot, if any.
    pub extension: Option<String>,
}

impl FileEntry {
    /// Build an entry, deriving the extension from the name.
    pub fn new(id: FileEntryId, name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let extension = std::path::Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        Self {
            id,
            name,
            size,
            extension,
        }
    }

    /// Final path component, used as the download file name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}
