//! HTTP submission server configuration.

use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Graceful shutdown timeout in seconds, shared by the HTTP server
    /// and the worker pool.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

impl ServerConfig {
    /// The `host:port` pair to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_body_limit() -> usize {
    64 * 1024
}

fn default_shutdown_grace() -> u64 {
    30
}
