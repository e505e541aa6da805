pub mod core;
pub mod models;
pub mod platform;

use crate::core::config::{Config, ConfigError};
use crate::core::logging;
use crate::core::session::{SessionContext, SessionError};
use crate::models::capture::CaptureError;
use crate::platform::transport::{self, AppState, TransportError};
use std::sync::Arc;

/// Top-level failures that stop the server
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize sessions: {0}")]
    Session(#[from] SessionError),

    #[error("Failed to start camera: {0}")]
    Capture(#[from] CaptureError),

    #[error("Server error: {0}")]
    Transport(#[from] TransportError),
}

pub type AppResult<T> = Result<T, AppError>;

/// Load configuration, install logging and serve until Ctrl-C
pub async fn run() -> AppResult<()> {
    let config = Config::load()?;
    logging::init(&config.log_level);
    tracing::info!("Configuration loaded from {}", Config::config_path()?.display());

    let ctx = Arc::new(SessionContext::from_config(&config)?);
    if config.camera.auto_start {
        ctx.source.start().await?;
    }

    let state = AppState { ctx: ctx.clone() };
    transport::serve(&config.bind_address(), state, shutdown_signal()).await?;

    ctx.source.stop().await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
