pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod format;
pub mod job;
pub mod metrics;
pub(crate) mod storage;
pub mod strategy;
pub mod sweeper;
pub mod testing;
pub mod upload;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use dispatcher::{
    DispatchError, Dispatcher, DispatcherConfig, DownloadedFile, PoolStatus, SubmitRequest,
    ValidationError,
};
pub use executor::{ExecutionReport, ExecutorConfig, FallbackExecutor};
pub use format::{Format, FormatFamily, FormatPair};
pub use job::{JobSnapshot, JobStatus, JobStore};
pub use strategy::{Strategy, StrategyConfig, StrategyRegistry};
pub use sweeper::{SweepReport, Sweeper, SweeperConfig};
pub use upload::UploadCache;
