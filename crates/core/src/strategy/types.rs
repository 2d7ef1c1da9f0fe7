//! Types for the strategy module.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::format::FormatPair;

/// A single conversion request handed to a strategy.
#[derive(Debug, Clone)]
pub struct StrategyRequest {
    /// Job this request belongs to.
    pub job_id: String,
    /// Path to the (shared, read-only) input file.
    pub input_path: PathBuf,
    /// Where the strategy must write its output.
    pub output_path: PathBuf,
    /// Declared conversion pair.
    pub pair: FormatPair,
}

/// Result of a single strategy invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    /// Output was produced. A warning marks reduced fidelity.
    Success { warning: Option<String> },
    /// The strategy could not produce output; try the next one.
    SoftFailure { reason: String },
}

impl StrategyOutcome {
    /// Full-fidelity success.
    pub fn success() -> Self {
        Self::Success { warning: None }
    }

    /// Success with reduced fidelity.
    pub fn degraded(warning: impl Into<String>) -> Self {
        Self::Success {
            warning: Some(warning.into()),
        }
    }

    /// Recoverable failure.
    pub fn soft_failure(reason: impl Into<String>) -> Self {
        Self::SoftFailure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Callback invoked with raw progress values.
pub type ProgressCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Progress sink handed to strategies.
///
/// Strategies may report any value any number of times; the receiving side
/// is responsible for clamping.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// A reporter that discards every update.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Reports a percentage.
    pub fn report(&self, percent: u32) {
        if let Some(ref callback) = self.callback {
            callback(percent);
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("attached", &self.callback.is_some())
            .finish()
    }
}
