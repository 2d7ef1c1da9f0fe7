//! Mock strategy for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::strategy::{
    ProgressReporter, Strategy, StrategyError, StrategyOutcome, StrategyRequest,
};

/// What a [`MockStrategy`] does when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Write the output and succeed.
    Succeed,
    /// Write the output and succeed with a warning.
    Degrade(String),
    /// Return a soft failure without touching the output.
    SoftFail(String),
    /// Write some bytes to the output, then soft fail.
    LeavePartial(String),
    /// Return an `Err`.
    Error(String),
    /// Panic inside `convert`.
    Panic(String),
    /// Claim success without writing anything.
    SucceedWithoutOutput,
    /// Never return.
    Hang,
}

/// Mock implementation of the Strategy trait.
///
/// Provides controllable behavior for testing:
/// - Scripted outcome (success, degraded, soft failure, error, panic, hang)
/// - Recorded requests for assertions
/// - Progress values reported before finishing
/// - Simulated duration
/// - Peak concurrency tracking
///
/// # Example
///
/// ```rust,ignore
/// use transmute_core::testing::MockStrategy;
///
/// let first = Arc::new(MockStrategy::failing("strategy-1", "no tool"));
/// let second = Arc::new(MockStrategy::degraded("strategy-2", "text only"));
///
/// // ... run a job through both ...
///
/// assert_eq!(second.call_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockStrategy {
    name: String,
    /// Current scripted behavior.
    behavior: Arc<RwLock<MockBehavior>>,
    /// Requests received, in order.
    calls: Arc<RwLock<Vec<StrategyRequest>>>,
    /// Simulated conversion duration in milliseconds.
    delay_ms: Arc<RwLock<u64>>,
    /// Progress values reported at the start of every call.
    progress_steps: Arc<RwLock<Vec<u32>>>,
    /// Bytes written as output on success.
    output: Arc<RwLock<Vec<u8>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockStrategy {
    /// Create a mock with the given behavior.
    pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            behavior: Arc::new(RwLock::new(behavior)),
            calls: Arc::new(RwLock::new(Vec::new())),
            delay_ms: Arc::new(RwLock::new(0)),
            progress_steps: Arc::new(RwLock::new(Vec::new())),
            output: Arc::new(RwLock::new(b"converted".to_vec())),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn succeeding(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Succeed)
    }

    pub fn degraded(name: impl Into<String>, warning: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Degrade(warning.into()))
    }

    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::SoftFail(reason.into()))
    }

    pub fn leaving_partial(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::LeavePartial(reason.into()))
    }

    pub fn erroring(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Error(reason.into()))
    }

    pub fn panicking(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Panic("mock strategy panic".to_string()))
    }

    pub fn without_output(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::SucceedWithoutOutput)
    }

    pub fn hanging(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Hang)
    }

    /// Sets the simulated conversion duration.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Arc::new(RwLock::new(delay.as_millis() as u64));
        self
    }

    /// Sets the progress values reported on every call.
    pub fn with_progress(mut self, steps: Vec<u32>) -> Self {
        self.progress_steps = Arc::new(RwLock::new(steps));
        self
    }

    /// Sets the bytes written on success.
    pub fn with_output(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.output = Arc::new(RwLock::new(bytes.into()));
        self
    }

    /// Change the behavior for subsequent calls.
    pub async fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// Get the number of invocations.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Get all recorded requests.
    pub async fn recorded_calls(&self) -> Vec<StrategyRequest> {
        self.calls.read().await.clone()
    }

    /// Highest number of simultaneous invocations seen.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn write_output(&self, request: &StrategyRequest) -> Result<(), StrategyError> {
        let bytes = self.output.read().await.clone();
        tokio::fs::write(&request.output_path, bytes).await?;
        Ok(())
    }
}

/// Decrements the active counter even if the call is aborted.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Strategy for MockStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn convert(
        &self,
        request: &StrategyRequest,
        progress: &ProgressReporter,
    ) -> Result<StrategyOutcome, StrategyError> {
        self.calls.write().await.push(request.clone());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        let _guard = ActiveGuard(Arc::clone(&self.active));

        let steps = self.progress_steps.read().await.clone();
        for step in steps {
            progress.report(step);
        }

        let delay = *self.delay_ms.read().await;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let behavior = self.behavior.read().await.clone();
        match behavior {
            MockBehavior::Succeed => {
                self.write_output(request).await?;
                Ok(StrategyOutcome::success())
            }
            MockBehavior::Degrade(warning) => {
                self.write_output(request).await?;
                Ok(StrategyOutcome::degraded(warning))
            }
            MockBehavior::SoftFail(reason) => Ok(StrategyOutcome::soft_failure(reason)),
            MockBehavior::LeavePartial(reason) => {
                tokio::fs::write(&request.output_path, b"partial").await?;
                Ok(StrategyOutcome::soft_failure(reason))
            }
            MockBehavior::Error(reason) => Err(StrategyError::unreadable(reason)),
            MockBehavior::Panic(message) => panic!("{}", message),
            MockBehavior::SucceedWithoutOutput => Ok(StrategyOutcome::success()),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(StrategyOutcome::soft_failure("unreachable"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, FormatPair};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mock_records_calls_and_writes_output() {
        let temp = TempDir::new().unwrap();
        let request = StrategyRequest {
            job_id: "job-1".to_string(),
            input_path: temp.path().join("in"),
            output_path: temp.path().join("out.pdf"),
            pair: FormatPair::new(Format::Docx, Format::Pdf),
        };
        let mock = MockStrategy::succeeding("mock").with_output("pdf bytes");

        let outcome = mock
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(mock.call_count().await, 1);
        assert_eq!(mock.recorded_calls().await[0].job_id, "job-1");
        assert_eq!(std::fs::read(&request.output_path).unwrap(), b"pdf bytes");
        assert_eq!(mock.peak_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_set_behavior() {
        let temp = TempDir::new().unwrap();
        let request = StrategyRequest {
            job_id: "job-2".to_string(),
            input_path: temp.path().join("in"),
            output_path: temp.path().join("out.txt"),
            pair: FormatPair::new(Format::Pdf, Format::Txt),
        };
        let mock = MockStrategy::succeeding("mock");
        mock.set_behavior(MockBehavior::SoftFail("changed".to_string()))
            .await;

        let outcome = mock
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap();
        assert_eq!(outcome, StrategyOutcome::soft_failure("changed"));
    }
}
