//! Application builder and server lifecycle.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;

use relayq_core::config::AppConfig;
use relayq_core::error::{AppError, ErrorKind};
use relayq_core::result::AppResult;
use relayq_worker::JobSystem;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state).layer(TraceLayer::new_for_http())
}

/// Run the submission server and worker pool until a shutdown signal.
///
/// The HTTP listener stops first, then the pool drains in-flight jobs
/// within `server.shutdown_grace_seconds`.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        queue = %config.queue.name,
        store = %config.store.provider,
        concurrency = config.worker.concurrency,
        "Starting relayq"
    );

    let system = Arc::new(JobSystem::from_config(&config).await?);
    let addr = config.server.bind_addr();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let app = build_app(AppState::new(config, Arc::clone(&system)));

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Internal, format!("Failed to bind {addr}"), e)
    })?;

    tracing::info!(addr = %addr, "Server (producer + consumer) is running");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown");
        })
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Server error", e));

    system.shutdown(grace).await;
    served?;

    tracing::info!("relayq shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
