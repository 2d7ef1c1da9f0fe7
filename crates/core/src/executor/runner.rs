//! Fallback executor implementation.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::job::{AttemptOutcome, JobError, JobStore, StrategyAttempt};
use crate::metrics;
use crate::storage;
use crate::strategy::{
    ProgressReporter, Strategy, StrategyChain, StrategyError, StrategyOutcome, StrategyRequest,
};

use super::config::ExecutorConfig;
use super::types::ExecutionReport;

/// Error message of a job stopped by its cancellation token.
pub const CANCELLED_MESSAGE: &str = "conversion cancelled";

/// How a single strategy task ended.
enum TaskResult {
    Finished(Result<StrategyOutcome, StrategyError>),
    Panicked(String),
    TimedOut,
    Cancelled,
}

/// Runs a job's strategy chain in order until one succeeds.
///
/// Every failure mode of a strategy (soft failure, error, panic, timeout,
/// success without output) escalates to the next strategy. Only exhausting
/// the chain is fatal, and a job is never left converting.
pub struct FallbackExecutor {
    store: Arc<JobStore>,
    config: ExecutorConfig,
}

impl FallbackExecutor {
    pub fn new(store: Arc<JobStore>, config: ExecutorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes `job_id` against `chain`.
    pub async fn execute(
        &self,
        job_id: &str,
        chain: &StrategyChain,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let Some((status, pair, input_hash, target)) = self.store.read(job_id, |job| {
            (
                job.status(),
                job.pair(),
                job.input_hash().to_string(),
                job.target_path().to_path_buf(),
            )
        }) else {
            return ExecutionReport::Vanished;
        };

        if status.is_terminal() {
            debug!(job_id, %status, "Job already terminal, skipping");
            return ExecutionReport::Skipped { status };
        }

        if cancel.is_cancelled() {
            return self.cancel_job(job_id, &target, Instant::now()).await;
        }

        if let Err(e) = self.store.mutate(job_id, |job| job.start()) {
            return self.on_store_error(job_id, &target, e).await;
        }

        let request = StrategyRequest {
            job_id: job_id.to_string(),
            input_path: self.store.uploads().path_for(&input_hash),
            output_path: target.clone(),
            pair,
        };
        let progress = self.progress_for(job_id);
        let started = Instant::now();
        let mut failures: Vec<(String, String)> = Vec::new();

        info!(job_id, %pair, strategies = chain.len(), "Starting conversion");

        for (index, strategy) in chain.iter().enumerate() {
            if cancel.is_cancelled() {
                return self.cancel_job(job_id, &target, started).await;
            }
            if index > 0 {
                metrics::ESCALATIONS.inc();
                info!(
                    job_id,
                    strategy = strategy.name(),
                    previous = %failures.last().map(|(s, _)| s.as_str()).unwrap_or_default(),
                    "Escalating to next strategy"
                );
            }

            let name = strategy.name().to_string();
            let attempt_started = Instant::now();
            let result = self
                .run_strategy(Arc::clone(strategy), request.clone(), progress.clone(), cancel)
                .await;

            let (outcome, reason, warning) = match result {
                TaskResult::Cancelled => {
                    return self.cancel_job(job_id, &target, started).await;
                }
                TaskResult::Finished(Ok(StrategyOutcome::Success { warning })) => {
                    if output_exists(&target).await {
                        let outcome = if warning.is_some() {
                            AttemptOutcome::Degraded
                        } else {
                            AttemptOutcome::Success
                        };
                        (outcome, warning.clone(), warning)
                    } else {
                        (
                            AttemptOutcome::NoOutput,
                            Some("reported success but produced no output".to_string()),
                            None,
                        )
                    }
                }
                TaskResult::Finished(Ok(StrategyOutcome::SoftFailure { reason })) => {
                    (AttemptOutcome::SoftFailure, Some(reason), None)
                }
                TaskResult::Finished(Err(e)) => (AttemptOutcome::Error, Some(e.detail()), None),
                TaskResult::Panicked(message) => (
                    AttemptOutcome::Panic,
                    Some(StrategyError::Panicked(message).to_string()),
                    None,
                ),
                TaskResult::TimedOut => (
                    AttemptOutcome::Timeout,
                    Some(
                        StrategyError::Timeout {
                            secs: self.config.strategy_timeout_secs,
                        }
                        .to_string(),
                    ),
                    None,
                ),
            };

            metrics::STRATEGY_ATTEMPTS
                .with_label_values(&[name.as_str(), outcome.as_str()])
                .inc();

            let attempt = StrategyAttempt {
                strategy: name.clone(),
                outcome,
                reason: reason.clone(),
                duration_ms: attempt_started.elapsed().as_millis() as u64,
            };
            if let Err(e) = self.store.mutate(job_id, |job| job.record_attempt(attempt)) {
                return self.on_store_error(job_id, &target, e).await;
            }

            if outcome.is_success() {
                if let Err(e) = self
                    .store
                    .mutate(job_id, |job| job.complete(name.as_str(), warning.clone()))
                {
                    return self.on_store_error(job_id, &target, e).await;
                }

                let report = ExecutionReport::Completed {
                    strategy: name,
                    warning,
                    attempts: index + 1,
                };
                metrics::JOB_DURATION
                    .with_label_values(&[report.as_str()])
                    .observe(started.elapsed().as_secs_f64());
                info!(job_id, strategy = %strategy.name(), attempts = index + 1, "Conversion completed");
                return report;
            }

            let reason = reason.unwrap_or_default();
            warn!(job_id, strategy = %name, outcome = outcome.as_str(), %reason, "Strategy failed");
            if let Err(e) = storage::remove_if_exists(&target).await {
                warn!(job_id, error = %e, "Failed to remove partial output");
            }
            failures.push((name, reason));
        }

        let message = exhausted_message(&pair.to_string(), &failures);
        let attempts = failures.len();
        if let Err(e) = self.store.mutate(job_id, |job| job.fail(message.as_str())) {
            return self.on_store_error(job_id, &target, e).await;
        }

        metrics::JOB_DURATION
            .with_label_values(&["error"])
            .observe(started.elapsed().as_secs_f64());
        warn!(job_id, %message, "Conversion failed");
        ExecutionReport::Failed { message, attempts }
    }

    /// Runs one strategy in its own task, under the timeout and the job's
    /// cancellation token.
    async fn run_strategy(
        &self,
        strategy: Arc<dyn Strategy>,
        request: StrategyRequest,
        progress: ProgressReporter,
        cancel: &CancellationToken,
    ) -> TaskResult {
        let timeout = self.config.strategy_timeout();
        let mut handle = tokio::spawn(async move {
            tokio::time::timeout(timeout, strategy.convert(&request, &progress)).await
        });

        tokio::select! {
            joined = &mut handle => match joined {
                Ok(Ok(result)) => TaskResult::Finished(result),
                Ok(Err(_elapsed)) => TaskResult::TimedOut,
                Err(e) if e.is_panic() => TaskResult::Panicked(panic_message(e.into_panic())),
                Err(e) => TaskResult::Panicked(e.to_string()),
            },
            _ = cancel.cancelled() => {
                // Dropping the future kills any child process it spawned.
                handle.abort();
                TaskResult::Cancelled
            }
        }
    }

    /// Progress sink that writes into the job record.
    fn progress_for(&self, job_id: &str) -> ProgressReporter {
        let store = Arc::clone(&self.store);
        let job_id = job_id.to_string();
        ProgressReporter::new(Arc::new(move |percent| {
            // Late reports after a terminal transition are expected and dropped.
            let _ = store.mutate(&job_id, |job| job.report_progress(percent));
        }))
    }

    async fn cancel_job(&self, job_id: &str, target: &Path, started: Instant) -> ExecutionReport {
        if let Err(e) = storage::remove_if_exists(target).await {
            warn!(job_id, error = %e, "Failed to remove partial output");
        }
        match self.store.mutate(job_id, |job| job.fail(CANCELLED_MESSAGE)) {
            Ok(()) | Err(JobError::AlreadyTerminal { .. }) => {}
            Err(JobError::NotFound(_)) => return ExecutionReport::Vanished,
            Err(e) => warn!(job_id, error = %e, "Failed to mark job cancelled"),
        }
        metrics::JOB_DURATION
            .with_label_values(&["cancelled"])
            .observe(started.elapsed().as_secs_f64());
        info!(job_id, "Conversion cancelled");
        ExecutionReport::Cancelled
    }

    /// A transition failed because the job changed under us.
    async fn on_store_error(&self, job_id: &str, target: &Path, err: JobError) -> ExecutionReport {
        match err {
            JobError::NotFound(_) => {
                debug!(job_id, "Job deleted while running, discarding output");
                if let Err(e) = storage::remove_if_exists(target).await {
                    warn!(job_id, error = %e, "Failed to remove orphaned output");
                }
                ExecutionReport::Vanished
            }
            JobError::AlreadyTerminal { status, .. } => ExecutionReport::Skipped { status },
            other => {
                warn!(job_id, error = %other, "Unexpected job state");
                match self.store.mutate(job_id, |job| job.fail(other.to_string())) {
                    Ok(()) => ExecutionReport::Failed {
                        message: other.to_string(),
                        attempts: 0,
                    },
                    Err(_) => ExecutionReport::Vanished,
                }
            }
        }
    }
}

async fn output_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// `all N strategies failed for A -> B: [s1] r1; [s2] r2`
fn exhausted_message(pair: &str, failures: &[(String, String)]) -> String {
    if failures.is_empty() {
        return format!("no strategies available for {}", pair);
    }
    let details: Vec<String> = failures
        .iter()
        .map(|(strategy, reason)| format!("[{}] {}", strategy, reason))
        .collect();
    format!(
        "all {} strategies failed for {}: {}",
        failures.len(),
        pair,
        details.join("; ")
    )
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
