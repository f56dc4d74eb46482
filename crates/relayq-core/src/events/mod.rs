//! Job lifecycle events.
//!
//! Events are published by the worker pool right after a settle call
//! succeeds and consumed by observability subscribers. They are advisory:
//! the job store stays the only source of truth for job state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::id::{EventId, JobId};

/// Wrapper for a job event with delivery metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID.
    pub id: EventId,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// Queue the job belongs to.
    pub queue: String,
    /// The event payload.
    pub event: JobEvent,
}

impl EventEnvelope {
    /// Wrap an event for publication.
    pub fn new(queue: impl Into<String>, event: JobEvent) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            queue: queue.into(),
            event,
        }
    }
}

/// A terminal transition of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// The job was settled as completed.
    Completed {
        /// The job.
        #[serde(rename = "jobId")]
        job_id: JobId,
        /// Value returned by the handler.
        result: Value,
        /// Time between claim and settlement in milliseconds.
        #[serde(rename = "processingTimeMs")]
        processing_time_ms: u64,
    },
    /// The job was settled as failed.
    Failed {
        /// The job.
        #[serde(rename = "jobId")]
        job_id: JobId,
        /// Human-readable failure reason.
        #[serde(rename = "errorMessage")]
        error_message: String,
        /// Deliveries made before the job failed.
        #[serde(rename = "attemptsMade")]
        attempts_made: u32,
    },
}

impl JobEvent {
    /// The job this event refers to.
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Completed { job_id, .. } | Self::Failed { job_id, .. } => *job_id,
        }
    }

    /// Short event name, e.g. for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_wire_shape() {
        let job_id = JobId::new();
        let event = JobEvent::Completed {
            job_id,
            result: serde_json::json!({"processed": true}),
            processing_time_ms: 1002,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "completed");
        assert_eq!(json["jobId"], job_id.to_string());
        assert_eq!(json["processingTimeMs"], 1002);
    }

    #[test]
    fn test_failed_wire_shape() {
        let event = JobEvent::Failed {
            job_id: JobId::new(),
            error_message: "boom".to_string(),
            attempts_made: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["errorMessage"], "boom");
        assert_eq!(event.kind(), "failed");
    }
}
