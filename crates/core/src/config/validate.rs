use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Worker pool, upload limit, strategy timeout and sweep interval are non-zero
/// - Uploads and outputs live in different directories
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return invalid("server.port cannot be 0");
    }

    if config.dispatcher.max_concurrent_jobs == 0 {
        return invalid("dispatcher.max_concurrent_jobs must be at least 1");
    }
    if config.dispatcher.max_upload_bytes == 0 {
        return invalid("dispatcher.max_upload_bytes must be at least 1");
    }

    if config.executor.strategy_timeout_secs == 0 {
        return invalid("executor.strategy_timeout_secs must be at least 1");
    }

    if config.sweeper.interval_secs == 0 {
        return invalid("sweeper.interval_secs must be at least 1");
    }

    if config.storage.uploads_dir == config.storage.outputs_dir {
        return invalid("storage.uploads_dir and storage.outputs_dir must differ");
    }

    Ok(())
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.to_string()))
}
