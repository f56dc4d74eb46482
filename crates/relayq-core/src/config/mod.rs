//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and environment variables. Each sub-module represents a
//! logical configuration section. Every field carries a serde default, so
//! an empty source set still yields a runnable configuration.

pub mod app;
pub mod events;
pub mod logging;
pub mod queue;
pub mod store;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::events::EventsConfig;
use self::logging::LoggingConfig;
use self::queue::QueueConfig;
use self::store::StoreConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Longest accepted lease: one week.
pub const MAX_VISIBILITY_TIMEOUT_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// configuration (default.toml + environment overlay + env variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP submission server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Job store connection settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Queue semantics (name, visibility timeout, attempt cap).
    #[serde(default)]
    pub queue: QueueConfig,
    /// Worker pool settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Event notifier settings.
    #[serde(default)]
    pub events: EventsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment.
    ///
    /// Sources, later ones winning:
    /// `config/default.toml`, `config/{env}.toml`, `RELAYQ__SECTION__KEY`
    /// variables, and finally the plain `REDIS_HOST`, `REDIS_PORT`,
    /// `REDIS_USERNAME`, `REDIS_PASSWORD` and `PORT` variables.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RELAYQ")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("store.redis.host", std::env::var("REDIS_HOST").ok())?
            .set_override_option("store.redis.port", std::env::var("REDIS_PORT").ok())?
            .set_override_option("store.redis.username", std::env::var("REDIS_USERNAME").ok())?
            .set_override_option("store.redis.password", std::env::var("REDIS_PASSWORD").ok())?
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject configurations the worker pool cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.queue.name.trim().is_empty() {
            return Err(AppError::configuration("queue.name must not be empty"));
        }
        if self.worker.concurrency == 0 {
            return Err(AppError::configuration(
                "worker.concurrency must be at least 1",
            ));
        }
        if self.queue.max_attempts == 0 {
            return Err(AppError::configuration(
                "queue.max_attempts must be at least 1",
            ));
        }
        if self.queue.visibility_timeout_seconds == 0 {
            return Err(AppError::configuration(
                "queue.visibility_timeout_seconds must be at least 1",
            ));
        }
        if self.queue.visibility_timeout_seconds > MAX_VISIBILITY_TIMEOUT_SECONDS {
            return Err(AppError::configuration(format!(
                "queue.visibility_timeout_seconds must not exceed {MAX_VISIBILITY_TIMEOUT_SECONDS}"
            )));
        }
        if self.queue.reaper_interval_seconds == 0 {
            return Err(AppError::configuration(
                "queue.reaper_interval_seconds must be at least 1",
            ));
        }
        if self.worker.poll_interval_ms == 0 {
            return Err(AppError::configuration(
                "worker.poll_interval_ms must be at least 1",
            ));
        }
        Ok(())
    }
}
