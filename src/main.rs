//! Face Re-Aging Service
//!
//! Serves a pretrained face re-aging network over HTTP with OpenVINO
//! acceleration.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use reage::api::rest::{AppState, create_rest_router};
use reage::config::Config;
use reage::engine::{FaceReager, ModelPool};
use reage::error::ReageError;
use reage::service::ReagingService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the level can come from it
    let config_path = Config::default_path();
    let config_found = Path::new(&config_path).is_file();
    let config = if config_found {
        Config::load(&config_path).with_context(|| format!("Invalid config file {}", config_path))?
    } else {
        Config::default()
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting Face Re-Aging Service v{}", env!("CARGO_PKG_VERSION"));
    if !config_found {
        warn!("Using default config ({} not found)", config_path);
    }

    info!("Configuration loaded:");
    info!("  Listen: {}:{}", config.server.host, config.server.port);
    info!("  Device: {}", config.inference.device);
    info!(
        "  Window: {} / stride {} over {}px input",
        config.reaging.window_size, config.reaging.stride, config.reaging.input_size
    );

    // Models must load before we accept any traffic
    let pool = ModelPool::load(&config.inference, &config.models)
        .map_err(|e| ReageError::startup(format!("{:#}", e)))?;
    info!("Models compiled for device {}", pool.device());
    let pool = Arc::new(pool);

    let reager = Arc::new(FaceReager::new(pool, &config.reaging));
    let service = Arc::new(ReagingService::new(reager, &config.reaging));

    let app_state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });
    let router = create_rest_router(app_state, config.body_limit_bytes());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("REST API listening on http://{}", addr);
    info!("Face Re-Aging Service is ready!");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, cleaning up...");
}
