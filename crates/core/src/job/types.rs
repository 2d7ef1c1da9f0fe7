//! Job record and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::format::{Format, FormatPair};

use super::error::JobError;

/// Highest progress value a job may show before it completes.
pub const MAX_RUNNING_PROGRESS: u32 = 99;

/// Stem used for downloads when the upload had no usable name.
pub const DEFAULT_DOWNLOAD_STEM: &str = "converted_file";

/// Lifecycle of a job. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker.
    Pending,
    /// A strategy is running.
    Converting,
    /// Output is ready.
    Completed,
    /// Every strategy failed, or the job was cancelled.
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Converting => "converting",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single strategy invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Degraded,
    SoftFailure,
    Error,
    Panic,
    Timeout,
    NoOutput,
}

impl AttemptOutcome {
    /// Label used in metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Degraded => "degraded",
            AttemptOutcome::SoftFailure => "soft_failure",
            AttemptOutcome::Error => "error",
            AttemptOutcome::Panic => "panic",
            AttemptOutcome::Timeout => "timeout",
            AttemptOutcome::NoOutput => "no_output",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success | AttemptOutcome::Degraded)
    }
}

/// Diagnostic record of one strategy invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    pub outcome: AttemptOutcome,
    /// Failure reason or success warning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duration_ms: u64,
}

/// One conversion request.
///
/// Fields are private; every change goes through a transition method that
/// enforces the lifecycle rules.
#[derive(Debug, Clone)]
pub struct Job {
    id: String,
    status: JobStatus,
    progress: u32,
    pair: FormatPair,
    input_hash: String,
    original_filename: String,
    target_path: PathBuf,
    output_path: Option<PathBuf>,
    error_message: Option<String>,
    warning_message: Option<String>,
    strategy_used: Option<String>,
    attempts: Vec<StrategyAttempt>,
    downloaded: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a pending job that will write to `target_path`.
    pub fn new(
        id: impl Into<String>,
        pair: FormatPair,
        input_hash: impl Into<String>,
        original_filename: impl Into<String>,
        target_path: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            progress: 0,
            pair,
            input_hash: input_hash.into(),
            original_filename: original_filename.into(),
            target_path: target_path.into(),
            output_path: None,
            error_message: None,
            warning_message: None,
            strategy_used: None,
            attempts: Vec::new(),
            downloaded: false,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn pair(&self) -> FormatPair {
        self.pair
    }

    pub fn input_hash(&self) -> &str {
        &self.input_hash
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn attempts(&self) -> &[StrategyAttempt] {
        &self.attempts
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_downloaded(&self) -> bool {
        self.downloaded
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Pending -> Converting. Starting an already converting job is a no-op.
    pub fn start(&mut self) -> Result<(), JobError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Converting;
                self.progress = 0;
                self.started_at = Some(Utc::now());
                self.touch();
                Ok(())
            }
            JobStatus::Converting => Ok(()),
            status => Err(self.terminal_error(status)),
        }
    }

    /// Raises progress, capped below completion.
    ///
    /// Returns `false` when the value does not move progress forward.
    pub fn report_progress(&mut self, percent: u32) -> Result<bool, JobError> {
        self.require_converting()?;
        let percent = percent.min(MAX_RUNNING_PROGRESS);
        if percent <= self.progress {
            return Ok(false);
        }
        self.progress = percent;
        self.touch();
        Ok(true)
    }

    /// Appends a strategy attempt to the diagnostic log.
    pub fn record_attempt(&mut self, attempt: StrategyAttempt) -> Result<(), JobError> {
        self.require_converting()?;
        self.attempts.push(attempt);
        self.touch();
        Ok(())
    }

    /// Converting -> Completed.
    pub fn complete(
        &mut self,
        strategy: impl Into<String>,
        warning: Option<String>,
    ) -> Result<(), JobError> {
        self.require_converting()?;
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.output_path = Some(self.target_path.clone());
        self.strategy_used = Some(strategy.into());
        self.warning_message = warning;
        self.finish();
        Ok(())
    }

    /// Pending or Converting -> Error.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        if let status @ (JobStatus::Completed | JobStatus::Error) = self.status {
            return Err(self.terminal_error(status));
        }
        self.status = JobStatus::Error;
        self.error_message = Some(message.into());
        self.finish();
        Ok(())
    }

    /// Flags a completed job as fetched by a client.
    pub fn mark_downloaded(&mut self) -> Result<(), JobError> {
        if self.status != JobStatus::Completed {
            return Err(JobError::NotCompleted {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.downloaded = true;
        self.touch();
        Ok(())
    }

    /// Owned copy for readers.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            source_format: self.pair.source,
            destination_format: self.pair.destination,
            input_hash: self.input_hash.clone(),
            original_filename: self.original_filename.clone(),
            output_path: self.output_path.clone(),
            error_message: self.error_message.clone(),
            warning_message: self.warning_message.clone(),
            strategy_used: self.strategy_used.clone(),
            attempts: self.attempts.clone(),
            downloaded: self.downloaded,
            created_at: self.created_at,
            updated_at: self.updated_at,
            finished_at: self.finished_at,
        }
    }

    fn require_converting(&self) -> Result<(), JobError> {
        match self.status {
            JobStatus::Converting => Ok(()),
            status if status.is_terminal() => Err(self.terminal_error(status)),
            status => Err(JobError::NotConverting {
                id: self.id.clone(),
                status,
            }),
        }
    }

    fn terminal_error(&self, status: JobStatus) -> JobError {
        JobError::AlreadyTerminal {
            id: self.id.clone(),
            status,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.updated_at = now;
        self.finished_at = Some(now);
    }
}

/// Point-in-time copy of a job, safe to hand across threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub progress: u32,
    pub source_format: Format,
    pub destination_format: Format,
    pub input_hash: String,
    pub original_filename: String,
    pub output_path: Option<PathBuf>,
    pub error_message: Option<String>,
    pub warning_message: Option<String>,
    pub strategy_used: Option<String>,
    pub attempts: Vec<StrategyAttempt>,
    pub downloaded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobSnapshot {
    /// Name offered to the client: upload stem plus destination extension.
    pub fn download_filename(&self) -> String {
        let stem = Path::new(&self.original_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DOWNLOAD_STEM);
        format!("{}.{}", stem, self.destination_format.extension())
    }
}

/// Number of jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: usize,
    pub converting: usize,
    pub completed: usize,
    pub error: usize,
}

impl JobCounts {
    pub(crate) fn add(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Converting => self.converting += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.converting + self.completed + self.error
    }
}
