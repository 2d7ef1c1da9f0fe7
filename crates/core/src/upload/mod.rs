//! Content-addressable upload cache.
//!
//! Identical uploads resolve to one stored file with a reference count.
//! Jobs take a reference when they are created and give it back when they
//! are deleted; the sweeper removes entries nobody references.

mod cache;
mod error;
mod types;

pub use cache::{content_hash, UploadCache};
pub use error::UploadError;
pub use types::{ReclaimReport, UploadEntry};
