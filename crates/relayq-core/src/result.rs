//! Convenience result type alias for relayq.

use crate::error::AppError;

/// A specialized `Result` type for relayq operations.
pub type AppResult<T> = Result<T, AppError>;
