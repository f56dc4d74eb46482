//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use relayq_core::config::store::RedisStoreConfig;
use relayq_core::error::{AppError, ErrorKind};
use relayq_core::result::AppResult;

/// Redis client wrapper with a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisClient {
    /// Open a connection using the store configuration.
    pub async fn connect(config: &RedisStoreConfig) -> AppResult<Self> {
        let url = config.connection_url();
        info!(url = %mask_redis_url(&url), "Connecting to Redis job store");

        let client = Client::open(url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid Redis connection URL", e)
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to connect to Redis", e)
        })?;

        info!("Connected to Redis job store");
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// A cheap clone of the connection manager for one command.
    pub fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

/// Map a Redis failure onto the store error kind.
pub(crate) fn store_error(context: &str, err: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::StoreUnavailable, format!("{context}: {err}"), err)
}

/// Hide the password part of a Redis URL.
pub(crate) fn mask_redis_url(url: &str) -> String {
    let Some(at_pos) = url.find('@') else {
        return url.to_string();
    };
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url[..at_pos].rfind(':') {
        Some(colon_pos) if colon_pos >= scheme_end => {
            format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}
