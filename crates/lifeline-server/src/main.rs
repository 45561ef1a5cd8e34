//! Lifeline API server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `lifeline-config.yaml` (or defaults)
//! 3. Open the store (runs migrations for `PostgreSQL`)
//! 4. Provision the demo fleet into an empty store
//! 5. Build the routing oracle
//! 6. Serve HTTP until `Ctrl-C`
//! 7. Cancel running unit walks and close the store

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use lifeline_dispatch::{ConfigError, Dispatcher, LifelineConfig, provision};
use lifeline_server::{AppState, ServerConfig, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "lifeline-config.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("lifeline-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        store = ?config.store.backend,
        routing = ?config.routing.provider,
        port = config.server.port,
        "Configuration loaded"
    );

    // 3. Open the store.
    let store = config.store.open().await?;
    info!(backend = store.backend(), "Store ready");

    // 4. Provision the fleet.
    let report = provision(&store, &config.fleet, Utc::now()).await?;
    info!(
        cameras = report.cameras,
        hospitals = report.hospitals,
        ambulances = report.ambulances,
        "Fleet provisioned"
    );

    // 5. Routing oracle.
    let oracle = config.routing.build_oracle()?;
    info!(provider = oracle.name(), "Routing oracle ready");

    // 6. Serve.
    let dispatcher = Dispatcher::new(store.clone(), oracle, config.dispatcher_settings());
    let state = Arc::new(AppState::new(dispatcher.clone()));
    start_server(&ServerConfig::from(&config.server), state).await?;

    // 7. Shut down.
    dispatcher.shutdown().await;
    store.close().await;
    info!("lifeline-server stopped");

    Ok(())
}

/// Load `LIFELINE_CONFIG` or `lifeline-config.yaml`, falling back to
/// defaults when the file does not exist. Environment overrides apply
/// either way.
fn load_config() -> Result<LifelineConfig, ConfigError> {
    let path = std::env::var("LIFELINE_CONFIG")
        .map_or_else(|_| PathBuf::from(CONFIG_FILE), PathBuf::from);
    if path.exists() {
        info!(path = %path.display(), "Loading config file");
        LifelineConfig::from_file(&path)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        LifelineConfig::parse("")
    }
}
