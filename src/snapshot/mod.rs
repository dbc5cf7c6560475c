//! Snapshot file reading.
//!
//! A snapshot is a JSON document listing the categories and items the store
//! should contain:
//!
//! ```json
//! {
//!   "category": [{"name": "Drinks"}, {"name": "Snacks"}],
//!   "item": [{"name": "Cola", "category": "Drinks"}]
//! }
//! ```
//!
//! Record order is preserved; the engine processes records in file order.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::model::{CategoryRecord, ItemRecord};

/// The parsed contents of a snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub categories: Vec<CategoryRecord>,
    pub items: Vec<ItemRecord>,
    /// SHA256 hex digest of the raw file bytes.
    pub digest: String,
}

/// On-disk layout. Missing sections read as empty.
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default, rename = "category")]
    categories: Vec<CategoryRecord>,
    #[serde(default, rename = "item")]
    items: Vec<ItemRecord>,
}

impl Snapshot {
    /// Parse a snapshot from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] if the bytes are not a snapshot document.
    /// `origin` is only used in the error.
    pub fn from_bytes(bytes: &[u8], origin: &Path) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_slice(bytes).map_err(|e| Error::Snapshot {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            categories: file.categories,
            items: file.items,
            digest: digest(bytes),
        })
    }
}

/// Read and parse the snapshot at `path`.
///
/// # Errors
///
/// Returns [`Error::Snapshot`] if the file cannot be read or parsed.
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes = fs::read(path).map_err(|e| Error::Snapshot {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Snapshot::from_bytes(&bytes, path)
}

/// SHA256 hex digest of `bytes`.
#[must_use]
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
