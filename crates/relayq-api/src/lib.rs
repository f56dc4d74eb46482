//! # relayq-api
//!
//! HTTP boundary for relayq built on Axum.
//!
//! Accepts messages, looks up jobs and queue counts, and reports health.
//! Also owns server startup and graceful shutdown.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
