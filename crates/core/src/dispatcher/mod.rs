//! Request intake and the bounded worker pool.
//!
//! The [`Dispatcher`] is the facade the HTTP layer talks to:
//! - `submit`: validate, persist the upload, create the job, enqueue it
//! - `status` / `download` / `delete` / `list_jobs`
//! - `supported_formats` / `pool_status`
//! - `start` (startup recovery) and `shutdown` (cancel everything)
//!
//! # Example
//!
//! ```ignore
//! use transmute_core::dispatcher::{Dispatcher, DispatcherConfig, SubmitRequest};
//!
//! dispatcher.start().await?;
//! let job_id = dispatcher
//!     .submit(SubmitRequest::new(bytes, "report.docx", "DOCX", "PDF"))
//!     .await?;
//! let status = dispatcher.status(&job_id)?;
//! ```

mod config;
mod error;
mod pool;
mod service;
mod types;
mod validate;

pub use config::DispatcherConfig;
pub use error::{DispatchError, ValidationError};
pub use service::Dispatcher;
pub use types::{DownloadedFile, PoolStatus, RecoveryReport, SubmitRequest};
pub use validate::{validate_filename, validate_size};
