//! Job records and the store that owns them.
//!
//! A [`Job`] moves Pending -> Converting -> Completed | Error and never back.
//! The [`JobStore`] is the only place jobs live; readers get owned
//! [`JobSnapshot`]s and writers go through [`JobStore::mutate`].

mod error;
mod store;
mod types;

pub use error::JobError;
pub use store::JobStore;
pub use types::{
    AttemptOutcome, Job, JobCounts, JobSnapshot, JobStatus, StrategyAttempt,
    DEFAULT_DOWNLOAD_STEM, MAX_RUNNING_PROGRESS,
};
