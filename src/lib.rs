pub mod api; // HTTP boundary
pub mod authorization; // Role × action table
pub mod booking; // Booking ledger
pub mod config;
pub mod core_state; // Shared state behind the router
pub mod db;
pub mod directory; // Users, approval, tokens
pub mod models;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Anything that stops the service from starting or shutting down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] core_state::CoreError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::ServerConfig::from_env()?;
    let core = Arc::new(core_state::CoreState::open(&settings)?);

    match settings.admin_token.as_deref() {
        Some(token) => {
            core.bootstrap_admin(&settings.admin_email, token)?;
        }
        None => tracing::warn!("MEDBOOK_ADMIN_TOKEN not set; no admin account bootstrapped"),
    }

    let server =
        api::start_server_on(core, settings.bind_addr, settings.cors_origin.as_deref()).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    server.stop().await;
    Ok(())
}
