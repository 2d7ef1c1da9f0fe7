//! Concurrent in-memory job store.

use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::storage;
use crate::upload::UploadCache;

use super::error::JobError;
use super::types::{Job, JobCounts, JobSnapshot};

struct JobRecord {
    job: Job,
    cancel: CancellationToken,
}

/// Single source of truth for job state.
///
/// Locking is per shard; closures passed to [`JobStore::mutate`] run under
/// the entry's lock and must stay short.
pub struct JobStore {
    jobs: DashMap<String, JobRecord>,
    uploads: Arc<UploadCache>,
}

impl JobStore {
    pub fn new(uploads: Arc<UploadCache>) -> Self {
        Self {
            jobs: DashMap::new(),
            uploads,
        }
    }

    pub fn uploads(&self) -> &Arc<UploadCache> {
        &self.uploads
    }

    /// Inserts a new job. The job must already hold a reference on its
    /// upload cache entry.
    pub fn create(&self, job: Job, cancel: CancellationToken) -> JobSnapshot {
        let snapshot = job.snapshot();
        self.jobs
            .insert(job.id().to_string(), JobRecord { job, cancel });
        debug!(job_id = %snapshot.id, "Job created");
        snapshot
    }

    pub fn get(&self, id: &str) -> Option<JobSnapshot> {
        self.jobs.get(id).map(|r| r.job.snapshot())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    /// Applies `f` to the job under its entry lock.
    pub fn mutate<T, F>(&self, id: &str, f: F) -> Result<T, JobError>
    where
        F: FnOnce(&mut Job) -> Result<T, JobError>,
    {
        let mut record = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        f(&mut record.job)
    }

    /// Reads a value from the job without cloning the whole record.
    pub fn read<T, F>(&self, id: &str, f: F) -> Option<T>
    where
        F: FnOnce(&Job) -> T,
    {
        self.jobs.get(id).map(|r| f(&r.job))
    }

    /// Removes a job and everything it owns.
    ///
    /// Cancels the job if it is still running, gives back its upload
    /// reference and deletes its output file.
    pub async fn delete(&self, id: &str) -> Result<JobSnapshot, JobError> {
        let (_, record) = self
            .jobs
            .remove(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        record.cancel.cancel();
        let refcount = self.uploads.release(record.job.input_hash());
        if let Err(e) = storage::remove_if_exists(record.job.target_path()).await {
            warn!(job_id = %id, error = %e, "Failed to delete job output");
        }

        debug!(job_id = %id, ?refcount, "Job deleted");
        Ok(record.job.snapshot())
    }

    /// All jobs, oldest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut jobs: Vec<JobSnapshot> = self.jobs.iter().map(|r| r.job.snapshot()).collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        jobs
    }

    /// Ids of jobs matching `predicate`.
    pub fn ids_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&Job) -> bool,
    {
        self.jobs
            .iter()
            .filter(|r| predicate(&r.job))
            .map(|r| r.key().clone())
            .collect()
    }

    pub fn mark_downloaded(&self, id: &str) -> Result<(), JobError> {
        self.mutate(id, |job| job.mark_downloaded())
    }

    pub fn cancel_token(&self, id: &str) -> Option<CancellationToken> {
        self.jobs.get(id).map(|r| r.cancel.clone())
    }

    pub fn count_by_status(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for record in self.jobs.iter() {
            counts.add(record.job.status());
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Whether any job still references `path` as its output.
    pub fn references_output(&self, path: &std::path::Path) -> bool {
        self.jobs.iter().any(|r| r.job.target_path() == path)
    }
}

impl std::fmt::Debug for JobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStore")
            .field("jobs", &self.jobs.len())
            .finish()
    }
}
