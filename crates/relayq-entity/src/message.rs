//! Payload of jobs created through the submission boundary.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Job name used for submitted messages.
pub const MESSAGE_JOB_NAME: &str = "new-message";

/// A submitted message as stored in the job payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Message text.
    pub text: String,
    /// Submission time in epoch milliseconds.
    pub timestamp: i64,
}

impl MessagePayload {
    /// Stamp a message with the current time.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
