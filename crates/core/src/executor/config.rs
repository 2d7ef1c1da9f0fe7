//! Configuration for the fallback executor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Time budget for a single strategy invocation, in seconds.
    #[serde(default = "default_strategy_timeout")]
    pub strategy_timeout_secs: u64,
}

fn default_strategy_timeout() -> u64 {
    600 // 10 minutes
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            strategy_timeout_secs: default_strategy_timeout(),
        }
    }
}

impl ExecutorConfig {
    /// Sets the per-strategy timeout.
    pub fn with_strategy_timeout_secs(mut self, secs: u64) -> Self {
        self.strategy_timeout_secs = secs;
        self
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.strategy_timeout_secs, 600);
        assert_eq!(config.strategy_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ExecutorConfig = toml::from_str("").unwrap();
        assert_eq!(config.strategy_timeout_secs, 600);

        let config: ExecutorConfig = toml::from_str("strategy_timeout_secs = 5").unwrap();
        assert_eq!(config.strategy_timeout_secs, 5);
    }
}
