//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relayq_core::types::id::JobId;
use relayq_entity::job::{Job, JobStatus, QueueCounts};
use relayq_worker::runner::PoolMetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Acknowledgment of an accepted message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAccepted {
    /// Always `"success"`.
    pub status: String,
    /// Human-readable message.
    pub message: String,
    /// Id of the created job.
    #[serde(rename = "jobId")]
    pub job_id: JobId,
}

impl MessageAccepted {
    /// Acknowledge job `job_id`.
    pub fn new(job_id: JobId) -> Self {
        Self {
            status: "success".to_string(),
            message: "Message added to queue".to_string(),
            job_id,
        }
    }
}

/// Job as returned by `GET /jobs/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: JobId,
    pub queue: String,
    pub name: String,
    pub status: JobStatus,
    pub payload: Value,
    pub attempts_made: u32,
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        let processing_time_ms = job
            .status
            .is_terminal()
            .then(|| job.processing_time_ms())
            .flatten();
        Self {
            id: job.id,
            queue: job.queue,
            name: job.name,
            status: job.status,
            payload: job.payload,
            attempts_made: job.attempts_made,
            max_attempts: job.max_attempts,
            return_value: job.return_value,
            failure_reason: job.failure_reason,
            last_error: job.last_error,
            enqueued_at: job.enqueued_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            processing_time_ms,
        }
    }
}

/// Job counts of one queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueCountsResponse {
    /// Queue name.
    pub queue: String,
    /// Counts per status.
    #[serde(flatten)]
    pub counts: QueueCounts,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_seconds: u64,
    /// `"connected"` or `"unreachable"`.
    pub store: String,
    /// Worker pool counters, absent when the pool is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<PoolMetricsSnapshot>,
}
