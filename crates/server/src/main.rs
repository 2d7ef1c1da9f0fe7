use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transmute_core::dispatcher::RecoveryReport;
use transmute_core::{
    load_config, load_config_from_env, validate_config, Config, Dispatcher, FallbackExecutor,
    JobStore, StrategyRegistry, Sweeper, UploadCache,
};

use transmute_server::api::create_router;
use transmute_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration. An explicit path must exist; without one, a
    // missing config.toml means defaults plus environment overrides.
    let config = match std::env::var("TRANSMUTE_CONFIG").map(PathBuf::from) {
        Ok(path) => load_config_file(&path)?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config_file(Path::new(DEFAULT_CONFIG_PATH))?
        }
        Err(_) => {
            info!("No configuration file, using defaults and environment");
            load_config_from_env().context("Failed to load config from environment")?
        }
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, "Configuration loaded successfully");
    info!("Uploads directory: {:?}", config.storage.uploads_dir);
    info!("Outputs directory: {:?}", config.storage.outputs_dir);

    // Strategy table, fixed for the lifetime of the process
    let registry = Arc::new(StrategyRegistry::with_defaults(&config.strategies));
    info!(pairs = registry.len(), "Strategy registry built");

    let uploads = Arc::new(UploadCache::new(&config.storage.uploads_dir));
    let store = Arc::new(JobStore::new(uploads));
    let executor = FallbackExecutor::new(Arc::clone(&store), config.executor.clone());

    let dispatcher = Arc::new(Dispatcher::new(
        config.dispatcher.clone(),
        &config.storage.outputs_dir,
        registry,
        Arc::clone(&store),
        executor,
    ));

    // Remove leftovers from a previous run and start accepting jobs
    let recovery = dispatcher
        .start()
        .await
        .context("Failed to prepare storage directories")?;
    if recovery != RecoveryReport::default() {
        warn!(
            uploads = recovery.uploads_removed,
            outputs = recovery.outputs_removed,
            staging_dirs = recovery.staging_dirs_removed,
            "Removed orphaned files from a previous run"
        );
    }

    // Start the cleanup sweeper
    let sweeper_token = CancellationToken::new();
    let sweeper_handle = if config.sweeper.enabled {
        let sweeper = Arc::new(Sweeper::new(config.sweeper.clone(), Arc::clone(&store)));
        Some(sweeper.start_background_task(sweeper_token.clone()))
    } else {
        info!("Sweeper disabled in config");
        None
    };

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&dispatcher)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Cancel in-flight conversions; their jobs end in Error
    dispatcher.shutdown().await;

    sweeper_token.cancel();
    if let Some(handle) = sweeper_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "Sweeper task ended abnormally");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
fn load_config_file(path: &Path) -> Result<Config> {
    info!("Loading configuration from {:?}", path);
    load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
