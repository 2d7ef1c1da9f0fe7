//! Types for the upload cache.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Snapshot of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadEntry {
    /// SHA-256 of the content, lowercase hex.
    pub hash: String,
    /// Where the bytes live.
    pub storage_path: PathBuf,
    /// Number of jobs referencing this entry.
    pub refcount: u64,
    /// Content size.
    pub size_bytes: u64,
    /// Filename of the first upload that created the entry.
    pub original_name: String,
    pub created_at: DateTime<Utc>,
}

/// Result of a reclaim pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimReport {
    /// Hashes whose entries and files were deleted.
    pub removed: Vec<String>,
    /// Bytes freed.
    pub bytes_freed: u64,
}

/// Internal record behind an [`UploadEntry`].
#[derive(Debug, Clone)]
pub(super) struct EntryRecord {
    pub storage_path: PathBuf,
    pub refcount: u64,
    pub size_bytes: u64,
    pub original_name: String,
    pub created_at: DateTime<Utc>,
}

impl EntryRecord {
    pub fn snapshot(&self, hash: &str) -> UploadEntry {
        UploadEntry {
            hash: hash.to_string(),
            storage_path: self.storage_path.clone(),
            refcount: self.refcount,
            size_bytes: self.size_bytes,
            original_name: self.original_name.clone(),
            created_at: self.created_at,
        }
    }
}
