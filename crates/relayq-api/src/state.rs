//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use relayq_core::config::AppConfig;
use relayq_worker::JobSystem;

/// Application state passed to every handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Producer, pool, and store handle
    pub system: Arc<JobSystem>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Bundle configuration and a running job system.
    pub fn new(config: AppConfig, system: Arc<JobSystem>) -> Self {
        Self {
            config: Arc::new(config),
            system,
            started_at: Instant::now(),
        }
    }
}
