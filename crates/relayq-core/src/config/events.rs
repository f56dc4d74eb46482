//! Event notifier configuration.

use serde::{Deserialize, Serialize};

/// Event notifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the broadcast channel. Receivers that fall further
    /// behind than this lose the oldest events.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Whether the built-in logging subscriber is attached.
    #[serde(default = "default_true")]
    pub log_events: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            log_events: default_true(),
        }
    }
}

fn default_buffer_size() -> usize {
    1024
}

fn default_true() -> bool {
    true
}
