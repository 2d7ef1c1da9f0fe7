//! Cleanup sweeper implementation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::job::JobStore;
use crate::metrics;

use super::config::SweeperConfig;

/// What a single sweep removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired jobs deleted.
    pub jobs_removed: usize,
    /// Unreferenced upload entries deleted.
    pub uploads_removed: usize,
    /// Upload bytes freed.
    pub bytes_freed: u64,
}

/// Periodically deletes expired jobs and unreferenced uploads.
///
/// Only terminal jobs are ever removed, so artifacts of pending or
/// converting jobs are never touched.
pub struct Sweeper {
    config: SweeperConfig,
    store: Arc<JobStore>,
}

impl Sweeper {
    pub fn new(config: SweeperConfig, store: Arc<JobStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Runs one sweep against the current time.
    pub async fn run_once(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// Runs one sweep as if the current time were `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let expired = self.store.ids_where(|job| {
            job.is_terminal()
                && job.finished_at().is_some_and(|finished| {
                    now - finished >= self.config.retention_for(job.is_downloaded())
                })
        });

        let mut report = SweepReport::default();
        for id in expired {
            match self.store.delete(&id).await {
                Ok(job) => {
                    debug!(job_id = %id, status = %job.status, "Swept expired job");
                    metrics::JOBS_SWEPT.inc();
                    report.jobs_removed += 1;
                }
                // Deleted by a client in the meantime.
                Err(e) => debug!(job_id = %id, error = %e, "Job already gone"),
            }
        }

        let reclaimed = self.store.uploads().reclaim_unreferenced().await;
        report.uploads_removed = reclaimed.removed.len();
        report.bytes_freed = reclaimed.bytes_freed;

        if report.jobs_removed > 0 || report.uploads_removed > 0 {
            info!(
                jobs = report.jobs_removed,
                uploads = report.uploads_removed,
                bytes = report.bytes_freed,
                "Sweep completed"
            );
        } else {
            debug!("Nothing to sweep");
        }
        report
    }

    /// Starts the background task. It stops when `cancellation_token` fires.
    pub fn start_background_task(
        self: Arc<Self>,
        cancellation_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = Duration::from_secs(self.config.interval_secs.max(1));
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it.
            ticker.tick().await;

            info!(
                interval_secs = self.config.interval_secs,
                retention_secs = self.config.retention_secs,
                "Sweeper started"
            );

            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => {
                        info!("Sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = self.run_once().await;
                        if report.jobs_removed == 0 && report.uploads_removed == 0 {
                            continue;
                        }
                        if self.store.is_empty() && !self.store.uploads().is_empty() {
                            warn!(
                                entries = self.store.uploads().len(),
                                "Upload entries remain with no jobs"
                            );
                        }
                    }
                }
            }
        })
    }
}
