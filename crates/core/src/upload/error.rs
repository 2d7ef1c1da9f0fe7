//! Error types for the upload cache.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while persisting or reclaiming uploads.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Failed to create a storage directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write upload bytes.
    #[error("Failed to write upload {hash} to {path}")]
    WriteFailed {
        hash: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to delete a stored file.
    #[error("Failed to remove {path}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to list the storage directory.
    #[error("Failed to scan {path}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
