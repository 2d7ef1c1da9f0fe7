//! Error types for the job module.

use thiserror::Error;

use super::types::JobStatus;

/// Errors from job transitions and store lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    /// No job with this id.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job already reached a terminal state.
    #[error("Job {id} is already {status}")]
    AlreadyTerminal { id: String, status: JobStatus },

    /// The operation needs a converting job.
    #[error("Job {id} is not converting (status: {status})")]
    NotConverting { id: String, status: JobStatus },

    /// The job has no output to hand out yet.
    #[error("Job {id} is not completed (status: {status})")]
    NotCompleted { id: String, status: JobStatus },
}
