//! Error types for the dispatcher.

use std::path::PathBuf;
use thiserror::Error;

use crate::format::Format;
use crate::job::JobStatus;
use crate::upload::UploadError;

/// A submission rejected before any job was created.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A format tag is not recognized.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// Both tags are known but no strategy handles the pair.
    #[error("Conversion from {from} to {to} is not supported")]
    UnsupportedPair { from: Format, to: Format },

    /// The upload has no content.
    #[error("Uploaded file is empty")]
    EmptyFile,

    /// The upload exceeds the configured limit.
    #[error("File too large: {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// The filename could escape the storage directory.
    #[error("Unsafe filename: {0:?}")]
    UnsafeFilename(String),
}

impl ValidationError {
    /// Short label used in metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownFormat(_) => "unknown_format",
            Self::UnsupportedPair { .. } => "unsupported_pair",
            Self::EmptyFile => "empty",
            Self::TooLarge { .. } => "too_large",
            Self::UnsafeFilename(_) => "unsafe_filename",
        }
    }
}

/// Errors returned by the dispatcher facade.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No job with this id.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job has not completed yet.
    #[error("Job {id} is not completed yet (status: {status})")]
    NotReady { id: String, status: JobStatus },

    /// The job completed but its output file is gone.
    #[error("Converted file not found for job {0}")]
    OutputMissing(String),

    /// The dispatcher is not accepting work.
    #[error("Dispatcher is not running")]
    NotRunning,

    /// Persisting the upload failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Filesystem error outside the upload cache.
    #[error("Storage error at {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
