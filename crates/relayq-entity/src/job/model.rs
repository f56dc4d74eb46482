//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relayq_core::types::id::JobId;

use super::status::JobStatus;

/// A unit of work held by the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Queue the job belongs to.
    pub queue: String,
    /// Job name given by the producer (e.g. `"new-message"`).
    pub name: String,
    /// Job-specific payload (JSON).
    pub payload: serde_json::Value,
    /// Current status.
    pub status: JobStatus,
    /// Number of times the job has been claimed.
    pub attempts_made: u32,
    /// Deliveries allowed before the job is routed to `failed`.
    pub max_attempts: u32,
    /// Slot currently holding the claim.
    pub worker_id: Option<String>,
    /// Deadline after which an unsettled claim becomes reclaimable.
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Handler result, set only on `completed`.
    pub return_value: Option<serde_json::Value>,
    /// Failure reason, set only on `failed`.
    pub failure_reason: Option<String>,
    /// Error of the most recent retryable failure.
    pub last_error: Option<String>,
    /// When the job was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// When the current (or last) delivery started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a fresh `waiting` job from a creation request.
    pub fn new(id: JobId, params: CreateJob, now: DateTime<Utc>) -> Self {
        Self {
            id,
            queue: params.queue,
            name: params.name,
            payload: params.payload,
            status: JobStatus::Waiting,
            attempts_made: 0,
            max_attempts: params.max_attempts.max(1),
            worker_id: None,
            lease_expires_at: None,
            return_value: None,
            failure_reason: None,
            last_error: None,
            enqueued_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// Whether another delivery is allowed after the current one.
    pub fn can_retry(&self) -> bool {
        self.attempts_made < self.max_attempts
    }

    /// Whether the job is active under `worker_id`.
    pub fn is_claimed_by(&self, worker_id: &str) -> bool {
        self.status == JobStatus::Active && self.worker_id.as_deref() == Some(worker_id)
    }

    /// Whether the job is active and its lease ran out before `now`.
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Active
            && self.lease_expires_at.is_some_and(|deadline| deadline <= now)
    }

    /// Milliseconds between claim and settlement, once both are known.
    pub fn processing_time_ms(&self) -> Option<u64> {
        let started = self.started_at?;
        let finished = self.finished_at?;
        Some((finished - started).num_milliseconds().max(0) as u64)
    }
}

/// Data required to enqueue a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    /// Target queue.
    pub queue: String,
    /// Job name.
    pub name: String,
    /// Job-specific payload.
    pub payload: serde_json::Value,
    /// Delivery cap.
    pub max_attempts: u32,
}
