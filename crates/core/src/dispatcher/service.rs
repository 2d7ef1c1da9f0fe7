//! Dispatcher implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::executor::{ExecutionReport, FallbackExecutor};
use crate::job::{Job, JobError, JobSnapshot, JobStatus, JobStore};
use crate::metrics;
use crate::storage;
use crate::strategy::{StrategyChain, StrategyRegistry, SupportedFormat, STAGE_PREFIX};

use super::config::DispatcherConfig;
use super::error::{DispatchError, ValidationError};
use super::pool::PoolStats;
use super::types::{DownloadedFile, PoolStatus, RecoveryReport, SubmitRequest};
use super::validate::{resolve_chain, validate_filename, validate_size};

/// Entry point for conversion requests.
///
/// Validates submissions, persists the upload, creates the job and hands it
/// to a bounded worker pool. Every job's cancellation token is a child of
/// the dispatcher's, so [`Dispatcher::shutdown`] stops all of them.
pub struct Dispatcher {
    config: DispatcherConfig,
    outputs_dir: PathBuf,
    registry: Arc<StrategyRegistry>,
    store: Arc<JobStore>,
    executor: Arc<FallbackExecutor>,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
    running: AtomicBool,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        outputs_dir: impl Into<PathBuf>,
        registry: Arc<StrategyRegistry>,
        store: Arc<JobStore>,
        executor: FallbackExecutor,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            config,
            outputs_dir: outputs_dir.into(),
            registry,
            store,
            executor: Arc::new(executor),
            semaphore,
            stats: Arc::new(PoolStats::default()),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Prepares storage and starts accepting jobs.
    ///
    /// Files in the upload and output directories that no in-memory record
    /// references are deleted first, so artifacts from a previous process
    /// never leak.
    pub async fn start(&self) -> Result<RecoveryReport, DispatchError> {
        for dir in [self.store.uploads().root(), self.outputs_dir.as_path()] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| DispatchError::Storage {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let uploads_removed = self.store.uploads().remove_orphans().await?;
        let storage_error = |source: std::io::Error| DispatchError::Storage {
            path: self.outputs_dir.clone(),
            source,
        };
        let staging_dirs_removed = storage::remove_prefixed_dirs(&self.outputs_dir, STAGE_PREFIX)
            .await
            .map_err(storage_error)?;
        let store = Arc::clone(&self.store);
        let outputs_removed =
            storage::remove_unreferenced(&self.outputs_dir, |path| store.references_output(path))
                .await
                .map_err(storage_error)?;

        self.running.store(true, Ordering::SeqCst);
        let report = RecoveryReport {
            uploads_removed,
            outputs_removed,
            staging_dirs_removed,
        };
        info!(
            uploads_removed,
            outputs_removed,
            staging_dirs_removed,
            workers = self.config.max_concurrent_jobs,
            "Dispatcher started"
        );
        Ok(report)
    }

    /// Cancels every in-flight job and waits for the workers to finish.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        info!("Dispatcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Validates and enqueues a conversion. Returns the new job id.
    ///
    /// Only validation and upload persistence happen on the caller's task.
    pub async fn submit(&self, request: SubmitRequest) -> Result<String, DispatchError> {
        if !self.is_running() {
            return Err(DispatchError::NotRunning);
        }

        let (pair, chain) = self.validate(&request).inspect_err(|e| {
            metrics::SUBMISSIONS_REJECTED
                .with_label_values(&[e.reason()])
                .inc();
            debug!(error = %e, "Rejected submission");
        })?;

        let entry = self
            .store
            .uploads()
            .store_or_reuse(&request.bytes, &request.filename)
            .await?;

        let job_id = Uuid::new_v4().to_string();
        let target = self
            .outputs_dir
            .join(format!("{}.{}", job_id, pair.destination.extension()));
        let cancel = self.shutdown.child_token();
        self.store.create(
            Job::new(&job_id, pair, &entry.hash, &request.filename, target),
            cancel.clone(),
        );

        metrics::JOBS_SUBMITTED
            .with_label_values(&[pair.source.as_str(), pair.destination.as_str()])
            .inc();
        info!(
            job_id = %job_id,
            %pair,
            hash = %entry.hash,
            refcount = entry.refcount,
            "Job submitted"
        );

        self.spawn_worker(job_id.clone(), chain, cancel);
        Ok(job_id)
    }

    fn validate(
        &self,
        request: &SubmitRequest,
    ) -> Result<(crate::format::FormatPair, StrategyChain), ValidationError> {
        let resolved = resolve_chain(
            &self.registry,
            &request.source_format,
            &request.destination_format,
        )?;
        validate_size(request.bytes.len() as u64, self.config.max_upload_bytes)?;
        validate_filename(&request.filename)?;
        Ok(resolved)
    }

    fn spawn_worker(&self, job_id: String, chain: StrategyChain, cancel: CancellationToken) {
        let semaphore = Arc::clone(&self.semaphore);
        let stats = Arc::clone(&self.stats);
        let executor = Arc::clone(&self.executor);

        stats.enqueue();
        self.tasks.spawn(async move {
            let permit = tokio::select! {
                permit = semaphore.acquire_owned() => permit.ok(),
                _ = cancel.cancelled() => None,
            };

            let Some(_permit) = permit else {
                // Still runs the executor so the job is marked cancelled.
                let report = executor.execute(&job_id, &chain, &cancel).await;
                stats.abandon(report.is_failure());
                return;
            };

            stats.activate();
            let report = executor.execute(&job_id, &chain, &cancel).await;
            stats.finish(report.is_completed());

            if let ExecutionReport::Failed { ref message, .. } = report {
                debug!(job_id = %job_id, %message, "Worker finished with failure");
            }
        });
    }

    pub fn status(&self, id: &str) -> Result<JobSnapshot, DispatchError> {
        self.store
            .get(id)
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))
    }

    /// Reads the output of a completed job and flags it as downloaded.
    pub async fn download(&self, id: &str) -> Result<DownloadedFile, DispatchError> {
        let job = self.status(id)?;
        if job.status != JobStatus::Completed {
            return Err(DispatchError::NotReady {
                id: id.to_string(),
                status: job.status,
            });
        }

        let path = job
            .output_path
            .as_deref()
            .ok_or_else(|| DispatchError::OutputMissing(id.to_string()))?;
        let bytes = read_output(path, id).await?;

        if let Err(JobError::NotFound(_)) = self.store.mark_downloaded(id) {
            return Err(DispatchError::NotFound(id.to_string()));
        }

        Ok(DownloadedFile {
            filename: job.download_filename(),
            bytes,
        })
    }

    /// Deletes a job, its output and its upload reference.
    pub async fn delete(&self, id: &str) -> Result<JobSnapshot, DispatchError> {
        let job = self.store.delete(id).await.map_err(|e| match e {
            JobError::NotFound(id) => DispatchError::NotFound(id),
            other => {
                warn!(job_id = %id, error = %other, "Unexpected error deleting job");
                DispatchError::NotFound(id.to_string())
            }
        })?;
        info!(job_id = %id, status = %job.status, "Job deleted");
        Ok(job)
    }

    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.store.list()
    }

    pub fn supported_formats(&self) -> Vec<SupportedFormat> {
        self.registry.supported_formats()
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.stats
            .to_status(self.is_running(), self.config.max_concurrent_jobs)
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }
}

async fn read_output(path: &Path, id: &str) -> Result<Vec<u8>, DispatchError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DispatchError::OutputMissing(id.to_string()))
        }
        Err(source) => Err(DispatchError::Storage {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("outputs_dir", &self.outputs_dir)
            .field("running", &self.is_running())
            .finish()
    }
}
