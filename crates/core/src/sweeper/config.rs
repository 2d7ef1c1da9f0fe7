//! Configuration for the cleanup sweeper.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Upper bound on any retention period (about a century).
const MAX_RETENTION_SECS: u64 = 100 * 365 * 24 * 3600;

/// Retention policy for finished jobs and unreferenced uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Whether the background task runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Interval between sweeps in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// How long a finished job stays pollable, in seconds.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Shorter grace period for jobs whose output was downloaded.
    #[serde(default = "default_downloaded_retention_secs")]
    pub downloaded_retention_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn default_retention_secs() -> u64 {
    3600 // 1 hour
}

fn default_downloaded_retention_secs() -> u64 {
    600 // 10 minutes
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            retention_secs: default_retention_secs(),
            downloaded_retention_secs: default_downloaded_retention_secs(),
        }
    }
}

impl SweeperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_retention_secs(mut self, secs: u64) -> Self {
        self.retention_secs = secs;
        self
    }

    pub fn with_downloaded_retention_secs(mut self, secs: u64) -> Self {
        self.downloaded_retention_secs = secs;
        self
    }

    /// Retention that applies to a finished job.
    pub fn retention_for(&self, downloaded: bool) -> Duration {
        let secs = if downloaded {
            self.downloaded_retention_secs.min(self.retention_secs)
        } else {
            self.retention_secs
        };
        Duration::seconds(secs.min(MAX_RETENTION_SECS) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SweeperConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.retention_secs, 3600);
        assert_eq!(config.downloaded_retention_secs, 600);
    }

    #[test]
    fn test_config_builder() {
        let config = SweeperConfig::new()
            .with_enabled(false)
            .with_interval_secs(5)
            .with_retention_secs(120)
            .with_downloaded_retention_secs(10);

        assert!(!config.enabled);
        assert_eq!(config.interval_secs, 5);
        assert_eq!(config.retention_for(false), Duration::seconds(120));
        assert_eq!(config.retention_for(true), Duration::seconds(10));
    }

    #[test]
    fn test_downloaded_retention_never_exceeds_base() {
        let config = SweeperConfig::new()
            .with_retention_secs(30)
            .with_downloaded_retention_secs(300);
        assert_eq!(config.retention_for(true), Duration::seconds(30));
    }
}
