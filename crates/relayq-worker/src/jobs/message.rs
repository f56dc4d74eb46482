//! The `new-message` job: submission and processing of text messages.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use relayq_core::error::AppError;
use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::job::Job;
use relayq_entity::message::{MESSAGE_JOB_NAME, MessagePayload};

use crate::executor::{HandlerError, JobHandler};
use crate::queue::JobQueue;

/// Message returned to callers that submit no text.
pub const EMPTY_MESSAGE_ERROR: &str = "No message provided";

/// Validate `text` and enqueue it as a `new-message` job.
///
/// Missing, empty, or whitespace-only text is rejected and never reaches
/// the store.
pub async fn submit_message(queue: &JobQueue, text: Option<&str>) -> AppResult<JobId> {
    let text = text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::validation(EMPTY_MESSAGE_ERROR))?;

    let payload = serde_json::to_value(MessagePayload::now(text))?;
    queue.enqueue(MESSAGE_JOB_NAME, payload).await
}

/// Processes submitted messages after a fixed simulated latency.
#[derive(Debug, Clone)]
pub struct MessageHandler {
    latency: Duration,
}

impl MessageHandler {
    /// Create a handler that takes `latency` per message
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl JobHandler for MessageHandler {
    async fn handle(&self, job: &Job) -> Result<Value, HandlerError> {
        let message: MessagePayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| HandlerError::permanent(format!("Invalid message payload: {e}")))?;

        tracing::info!(job_id = %job.id, text = %message.text, "Processing message");
        tokio::time::sleep(self.latency).await;

        let processing_time = Utc::now().timestamp_millis() - message.timestamp;
        Ok(json!({
            "processed": true,
            "processingTime": processing_time,
        }))
    }
}
