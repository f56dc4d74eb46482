//! Queue semantics configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration of the queue the producer writes to and the pool drains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Logical queue name.
    #[serde(default = "default_name")]
    pub name: String,
    /// How long a claimed job may stay unsettled before it becomes
    /// reclaimable.
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_seconds: u64,
    /// Maximum number of deliveries before a job is routed to `failed`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Interval between expired-lease sweeps.
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            visibility_timeout_seconds: default_visibility_timeout(),
            max_attempts: default_max_attempts(),
            reaper_interval_seconds: default_reaper_interval(),
        }
    }
}

impl QueueConfig {
    /// Visibility timeout as a [`Duration`].
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    /// Reaper sweep interval as a [`Duration`].
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_seconds)
    }
}

fn default_name() -> String {
    "messageQueue".to_string()
}

fn default_visibility_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_reaper_interval() -> u64 {
    5
}
