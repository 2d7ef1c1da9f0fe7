//! Types for the executor module.

use serde::Serialize;

use crate::job::JobStatus;

/// How one execution of a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ExecutionReport {
    /// The job was already terminal; nothing ran.
    Skipped { status: JobStatus },
    /// A strategy produced the output.
    Completed {
        strategy: String,
        warning: Option<String>,
        attempts: usize,
    },
    /// Every strategy failed.
    Failed { message: String, attempts: usize },
    /// The job's token fired before a strategy succeeded.
    Cancelled,
    /// The job was deleted while running.
    Vanished,
}

impl ExecutionReport {
    /// Whether the job ended up with an output file.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Whether the job ended in the error state.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Cancelled)
    }

    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped { .. } => "skipped",
            Self::Completed { warning: None, .. } => "completed",
            Self::Completed { .. } => "degraded",
            Self::Failed { .. } => "error",
            Self::Cancelled => "cancelled",
            Self::Vanished => "vanished",
        }
    }
}
