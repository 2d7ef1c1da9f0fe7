//! Background cleanup of expired jobs and unreferenced uploads.
//!
//! A finished job stays pollable for `retention_secs`, or for the shorter
//! `downloaded_retention_secs` once its output has been fetched. After that
//! the sweeper deletes the job, its output file, and its upload reference.
//! Uploads whose refcount reaches zero are reclaimed in the same pass.

mod config;
mod service;

pub use config::SweeperConfig;
pub use service::{SweepReport, Sweeper};
