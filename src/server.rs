//! Server startup, shutdown, and sweeper spawning logic.
//!
//! This module contains the `run_server` function which handles:
//! - Database initialization
//! - Migration running
//! - Application state creation
//! - Router creation
//! - Server binding and graceful shutdown
//! - Expiry sweeper spawning and cleanup

use crate::config::Config;
use crate::db::{LinkRepository, PgRepository};
use crate::error::{AppError, AppResult};
use crate::jobs::Sweeper;
use crate::routes;
use crate::services::store::UrlStore;
use crate::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// Run the web server with the given configuration.
///
/// Initializes the connection pool and the URL store, spawns the expiry
/// sweeper, sets up the router, and serves until a shutdown signal arrives.
///
/// # Errors
///
/// This function will return an error if:
/// - Database connection fails
/// - Migration fails
/// - Server binding fails
/// - Server runtime error occurs
pub async fn run_server(config: Config, addr: String, should_migrate: bool) -> AppResult<()> {
    info!("Starting snaplink server...");

    // Initialize database connection pool
    info!("Connecting to database...");
    let repository = PgRepository::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
        config.database.acquire_timeout_seconds,
    )
    .await?;

    // Run migrations if requested
    if should_migrate {
        info!("Running database migrations...");
        repository.run_migrations().await?;
        info!("Migrations completed successfully");
    }

    let repository: Arc<dyn LinkRepository> = Arc::new(repository);
    let store = UrlStore::new(
        repository.clone(),
        config.url.retention_seconds,
        config.url.short_code_length,
        config.url.short_code_max_attempts,
    );

    // Start the expiry sweeper in a separate task
    let (sweeper_shutdown_tx, sweeper_shutdown_rx) = watch::channel(false);
    let sweeper = Sweeper::new(store.clone(), config.sweep.interval_seconds);
    let sweeper_handle = tokio::spawn(sweeper.run(sweeper_shutdown_rx));

    // Create application state
    let state = Arc::new(AppState { store, repository });

    // Create router
    let app = routes::create_router(state, config.cors.allowed_origins);

    // Start server
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to address {}: {}", addr, e)))?;

    info!("Server listening on {}", addr);
    info!("Base URL: {}", config.url.base_url);

    // Set up graceful shutdown
    let shutdown_signal = create_shutdown_signal();

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    // Stop the sweeper and wait for it to finish
    let _ = sweeper_shutdown_tx.send(true);
    sweeper_handle.await.unwrap_or_else(|e| {
        error!("Sweeper task failed: {:?}", e);
    });

    info!("Server shutdown complete");
    Ok(())
}

/// Run a one-shot purge of expired links and exit.
pub async fn run_sweep(config: Config) -> AppResult<()> {
    info!("Connecting to database...");
    let repository: Arc<dyn LinkRepository> = Arc::new(
        PgRepository::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
            config.database.acquire_timeout_seconds,
        )
        .await?,
    );

    let store = UrlStore::new(
        repository,
        config.url.retention_seconds,
        config.url.short_code_length,
        config.url.short_code_max_attempts,
    );

    let purged = store.purge_expired().await?;
    info!(purged, "expired links removed");
    Ok(())
}

/// Create a future that resolves when a shutdown signal is received.
///
/// On Unix-like systems, this listens for both Ctrl+C (SIGINT) and SIGTERM.
/// On other platforms, it only listens for Ctrl+C.
///
/// # Panics
///
/// Panics if signal handler installation fails. This is intentional because
/// signal handler failures are unrecoverable system-level errors that indicate
/// the OS cannot deliver shutdown signals, making graceful shutdown impossible.
async fn create_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
