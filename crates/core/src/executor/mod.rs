//! Fallback executor.
//!
//! Walks a job's [`StrategyChain`](crate::strategy::StrategyChain) in
//! registry order. Each strategy runs in its own task under a timeout; any
//! failure is recorded on the job and the next strategy is tried. The first
//! verified success completes the job, and exhausting the chain fails it
//! with an aggregated message.

mod config;
mod runner;
mod types;

pub use config::ExecutorConfig;
pub use runner::{FallbackExecutor, CANCELLED_MESSAGE};
pub use types::ExecutionReport;
