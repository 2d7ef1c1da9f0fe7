use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::dispatcher::DispatcherConfig;
use crate::executor::ExecutorConfig;
use crate::strategy::StrategyConfig;
use crate::sweeper::SweeperConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub strategies: StrategyConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow cross-origin requests from any origin
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: default_enable_cors(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_enable_cors() -> bool {
    true
}

/// Where uploads and conversion outputs live on disk
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            outputs_dir: default_outputs_dir(),
        }
    }
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_outputs_dir() -> PathBuf {
    PathBuf::from("data/outputs")
}

/// Sanitized config for API responses (tool locations reduced to file names)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub dispatcher: DispatcherConfig,
    pub executor: ExecutorConfig,
    pub sweeper: SweeperConfig,
    pub strategies: SanitizedStrategyConfig,
}

/// External tools the registry wraps, without their install paths
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStrategyConfig {
    pub tools: Vec<String>,
    pub text_fallback: bool,
}

fn tool_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let s = &config.strategies;
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            dispatcher: config.dispatcher.clone(),
            executor: config.executor.clone(),
            sweeper: config.sweeper.clone(),
            strategies: SanitizedStrategyConfig {
                tools: [
                    &s.soffice_path,
                    &s.pandoc_path,
                    &s.ebook_convert_path,
                    &s.magick_path,
                    &s.rsvg_convert_path,
                    &s.ffmpeg_path,
                ]
                .into_iter()
                .map(|p| tool_name(p))
                .collect(),
                text_fallback: s.text_fallback,
            },
        }
    }
}
