//! Error types for the strategy module.

use std::path::PathBuf;
use thiserror::Error;

/// Faults a strategy can raise while converting.
///
/// The executor treats every variant the same way as a soft failure: the
/// reason is recorded and the next strategy in the chain is tried.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// External tool binary not found.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: String, path: PathBuf },

    /// External tool exited unsuccessfully.
    #[error("{tool} exited with code {code:?}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// Input could not be read or interpreted.
    #[error("unreadable input: {reason}")]
    UnreadableInput { reason: String },

    /// The tool reported success but the expected output is missing.
    #[error("output not created: {path}")]
    OutputMissing { path: PathBuf },

    /// The strategy exceeded its time budget.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The strategy task panicked.
    #[error("strategy panicked: {0}")]
    Panicked(String),

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrategyError {
    /// Creates a tool failure error, keeping only the tail of stderr.
    pub fn tool_failed(tool: impl Into<String>, code: Option<i32>, stderr: &str) -> Self {
        let stderr = stderr.trim();
        Self::ToolFailed {
            tool: tool.into(),
            code,
            stderr: if stderr.is_empty() {
                None
            } else {
                Some(tail(stderr, 512).to_string())
            },
        }
    }

    /// Creates an unreadable input error.
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self::UnreadableInput {
            reason: reason.into(),
        }
    }

    /// Human-readable reason including captured stderr, if any.
    pub fn detail(&self) -> String {
        match self {
            Self::ToolFailed {
                stderr: Some(stderr),
                ..
            } => format!("{}: {}", self, stderr.lines().last().unwrap_or_default()),
            _ => self.to_string(),
        }
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
