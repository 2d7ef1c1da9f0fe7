use std::sync::Arc;
use transmute_core::{Config, Dispatcher, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
