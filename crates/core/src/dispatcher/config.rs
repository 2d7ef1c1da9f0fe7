//! Configuration for the dispatcher.

use serde::{Deserialize, Serialize};

/// Dispatcher and worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum jobs converting at once.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Largest accepted upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_max_upload_bytes() -> u64 {
    100 * 1024 * 1024 // 100 MiB
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl DispatcherConfig {
    /// Sets the worker pool size.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Sets the upload size limit.
    pub fn with_max_upload_bytes(mut self, max: u64) -> Self {
        self.max_upload_bytes = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::default();
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.max_upload_bytes, 104_857_600);
    }

    #[test]
    fn test_config_builder() {
        let config = DispatcherConfig::default()
            .with_max_concurrent_jobs(1)
            .with_max_upload_bytes(10);
        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.max_upload_bytes, 10);
    }
}
