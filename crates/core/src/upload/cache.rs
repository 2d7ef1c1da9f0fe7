//! Content-addressable upload storage.

use chrono::Utc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::storage;

use super::error::UploadError;
use super::types::{EntryRecord, ReclaimReport, UploadEntry};

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Deduplicating store for uploaded bytes, keyed by content hash.
///
/// Files live at `<root>/<hash[0..2]>/<hash>`. Every operation that can
/// create or delete an entry runs under a per-hash async mutex, so two
/// callers racing on the same content never both write it, while
/// unrelated hashes proceed in parallel.
pub struct UploadCache {
    root: PathBuf,
    entries: DashMap<String, EntryRecord>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UploadCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage path for `hash`.
    pub fn path_for(&self, hash: &str) -> PathBuf {
        let prefix = hash.get(..2).unwrap_or(hash);
        self.root.join(prefix).join(hash)
    }

    /// Stores `bytes`, or takes another reference to an identical upload.
    ///
    /// The returned entry carries the refcount after this call.
    pub async fn store_or_reuse(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<UploadEntry, UploadError> {
        let hash = content_hash(bytes);
        let lock = self.lock_for(&hash);
        let _guard = lock.lock().await;

        let known_path = self.entries.get(&hash).map(|r| r.storage_path.clone());
        if let Some(path) = known_path {
            if fs::try_exists(&path).await.unwrap_or(false) {
                if let Some(entry) = self.increment(&hash) {
                    metrics::UPLOAD_DEDUP_HITS.inc();
                    debug!(hash = %hash, refcount = entry.refcount, "Reused cached upload");
                    return Ok(entry);
                }
            } else {
                warn!(hash = %hash, path = %path.display(), "Cached upload vanished, rewriting");
                self.persist(&hash, bytes).await?;
                if let Some(entry) = self.increment(&hash) {
                    return Ok(entry);
                }
            }
        }

        let storage_path = self.persist(&hash, bytes).await?;
        let record = EntryRecord {
            storage_path,
            refcount: 1,
            size_bytes: bytes.len() as u64,
            original_name: original_name.to_string(),
            created_at: Utc::now(),
        };
        let entry = record.snapshot(&hash);
        self.entries.insert(hash.clone(), record);

        metrics::UPLOADS_STORED.inc();
        debug!(hash = %hash, size = bytes.len(), "Stored new upload");
        Ok(entry)
    }

    /// Drops one reference. Never deletes; returns the new refcount.
    pub fn release(&self, hash: &str) -> Option<u64> {
        self.entries.get_mut(hash).map(|mut record| {
            record.refcount = record.refcount.saturating_sub(1);
            record.refcount
        })
    }

    pub fn get(&self, hash: &str) -> Option<UploadEntry> {
        self.entries.get(hash).map(|r| r.snapshot(hash))
    }

    /// Snapshot of every entry.
    pub fn entries(&self) -> Vec<UploadEntry> {
        self.entries
            .iter()
            .map(|r| r.value().snapshot(r.key()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deletes every entry whose refcount is zero, together with its file.
    ///
    /// The refcount is re-checked under the per-hash lock, so an upload that
    /// re-referenced the entry in the meantime keeps it alive.
    pub async fn reclaim_unreferenced(&self) -> ReclaimReport {
        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|r| r.refcount == 0)
            .map(|r| r.key().clone())
            .collect();

        let mut report = ReclaimReport::default();
        for hash in candidates {
            let lock = self.lock_for(&hash);
            let _guard = lock.lock().await;

            let Some((_, record)) = self.entries.remove_if(&hash, |_, r| r.refcount == 0) else {
                continue;
            };

            if let Err(e) = storage::remove_if_exists(&record.storage_path).await {
                warn!(hash = %hash, error = %e, "Failed to delete unreferenced upload, keeping entry");
                self.entries.insert(hash.clone(), record);
                continue;
            }

            self.forget_lock(&hash);
            metrics::UPLOADS_RECLAIMED.inc();
            debug!(hash = %hash, "Reclaimed unreferenced upload");
            report.bytes_freed += record.size_bytes;
            report.removed.push(hash);
        }
        report
    }

    /// Deletes files under the root that no entry points at.
    ///
    /// Run once at startup, before any upload is accepted.
    pub async fn remove_orphans(&self) -> Result<usize, UploadError> {
        let removed = storage::remove_unreferenced(&self.root, |path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| self.entries.get(name))
                .is_some_and(|record| record.storage_path == path)
        })
        .await
        .map_err(|source| UploadError::ScanFailed {
            path: self.root.clone(),
            source,
        })?;

        if removed > 0 {
            info!(removed, root = %self.root.display(), "Removed orphaned uploads");
        }
        Ok(removed)
    }

    fn increment(&self, hash: &str) -> Option<UploadEntry> {
        self.entries.get_mut(hash).map(|mut record| {
            record.refcount += 1;
            record.snapshot(hash)
        })
    }

    /// Writes to a temporary name and renames into place.
    async fn persist(&self, hash: &str, bytes: &[u8]) -> Result<PathBuf, UploadError> {
        let path = self.path_for(hash);
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| UploadError::DirectoryCreationFailed {
                path: dir.clone(),
                source,
            })?;

        let tmp = dir.join(format!(".{}.{}.tmp", hash, Uuid::new_v4().simple()));
        let written = match fs::write(&tmp, bytes).await {
            Ok(()) => fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(source) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(UploadError::WriteFailed {
                hash: hash.to_string(),
                path,
                source,
            });
        }
        Ok(path)
    }

    fn lock_for(&self, hash: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(hash.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the lock for `hash` if nobody but the caller holds it.
    fn forget_lock(&self, hash: &str) {
        self.locks
            .remove_if(hash, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

impl std::fmt::Debug for UploadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCache")
            .field("root", &self.root)
            .field("entries", &self.entries.len())
            .finish()
    }
}
