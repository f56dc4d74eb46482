//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Largest message accepted, in characters.
pub const MAX_MESSAGE_CHARS: u64 = 16 * 1024;

/// Body of `POST /message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SubmitMessageRequest {
    /// Message text. Missing and blank values are rejected downstream.
    #[serde(default)]
    #[validate(length(max = MAX_MESSAGE_CHARS, message = "Message is too long"))]
    pub message: Option<String>,
}
