//! Worker pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the pool is started alongside the server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent execution slots.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Milliseconds an idle slot waits before polling the store again.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Simulated processing latency of the message handler.
    #[serde(default = "default_simulated_latency")]
    pub simulated_latency_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval(),
            simulated_latency_ms: default_simulated_latency(),
        }
    }
}

impl WorkerConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    2
}

fn default_poll_interval() -> u64 {
    500
}

fn default_simulated_latency() -> u64 {
    1000
}
