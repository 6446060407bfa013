//! HTTP server initialization and runtime setup.
//!
//! Connects storage, builds the identifier generator, serves the router and
//! closes storage once the server has drained.

use crate::application::services::LinkService;
use crate::config::Config;
use crate::infrastructure::connect_storage;
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::id_generator::SnowflakeGenerator;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - the storage backend selected by `STORAGE_TYPE` (migrations included)
/// - the Snowflake generator for `NODE_ID`
/// - the Axum HTTP server, stopped by SIGINT or SIGTERM
///
/// # Errors
///
/// Returns an error if:
/// - storage cannot be connected
/// - the listen address is invalid or bind fails
/// - the server fails while running
pub async fn run(config: Config) -> Result<()> {
    let storage = connect_storage(&config).await?;

    let generator = Arc::new(SnowflakeGenerator::new(config.node_id));
    tracing::info!("Identifier generator ready (node {})", generator.node_id());

    let link_service = LinkService::new(
        storage.clone(),
        generator,
        config.base_url.clone(),
        config.storage_timeout(),
    );
    let state = AppState::new(Arc::new(link_service));

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    let served = axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tracing::info!("Server stopped, closing storage");
    if let Err(e) = storage.close().await {
        tracing::error!("Failed to close storage: {}", e);
    }

    served.context("Server error")
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
