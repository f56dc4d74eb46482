//! Unified application error types for relayq.
//!
//! Store backends, the worker pool, and the HTTP boundary all map their
//! failures into [`AppError`] so they propagate through the `?` operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Caller-supplied input failed validation. Never enqueued.
    Validation,
    /// The requested job or queue was not found.
    NotFound,
    /// The job store could not be reached or rejected the operation.
    StoreUnavailable,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// Whether errors of this kind are reported back to the submitting caller.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::Validation | Self::StoreUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::StoreUnavailable => write!(f, "STORE_UNAVAILABLE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout relayq.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a store-unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreUnavailable, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error is a transient store failure worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::StoreUnavailable
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
