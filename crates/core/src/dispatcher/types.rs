//! Types for the dispatcher module.

use serde::{Deserialize, Serialize};

/// A conversion request as received from a client.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Uploaded content.
    pub bytes: Vec<u8>,
    /// Client-supplied filename, possibly empty.
    pub filename: String,
    /// Declared source format tag.
    pub source_format: String,
    /// Requested destination format tag.
    pub destination_format: String,
}

impl SubmitRequest {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        source_format: impl Into<String>,
        destination_format: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            source_format: source_format.into(),
            destination_format: destination_format.into(),
        }
    }
}

/// A converted file ready to hand to the client.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Suggested attachment name.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Status of the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Whether the dispatcher accepts new jobs.
    pub running: bool,
    /// Number of converting jobs.
    pub active_jobs: usize,
    /// Maximum concurrent jobs.
    pub max_concurrent: usize,
    /// Number of jobs waiting for a worker.
    pub queued_jobs: usize,
    /// Jobs that finished with an output since startup.
    pub total_processed: u64,
    /// Jobs that finished without an output since startup.
    pub total_failed: u64,
}

/// Files removed by startup recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub uploads_removed: usize,
    pub outputs_removed: usize,
    pub staging_dirs_removed: usize,
}
