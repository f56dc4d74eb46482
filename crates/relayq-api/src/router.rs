//! Route definitions for the relayq HTTP API.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the router with all routes, threading `state` to every handler.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    Router::new()
        .merge(message_routes())
        .merge(job_routes())
        .merge(health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Message intake
fn message_routes() -> Router<AppState> {
    Router::new().route("/message", post(handlers::message::submit_message))
}

/// Job and queue inspection
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/{id}", get(handlers::job::get_job))
        .route("/queues/{name}/counts", get(handlers::queue::queue_counts))
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
