//! Results of store transitions that callers need to branch on.

use serde::{Deserialize, Serialize};

use relayq_core::types::id::JobId;

use super::model::Job;

/// Result of a settle or release call.
#[derive(Debug, Clone, PartialEq)]
pub enum SettleOutcome {
    /// The transition happened; carries the job as stored afterwards.
    Settled(Job),
    /// The job was already `completed` or `failed`. Nothing changed.
    AlreadyTerminal,
    /// The caller no longer holds the claim (the lease expired and the job
    /// was requeued or reclaimed by another slot). Nothing changed.
    Stale,
    /// No job with that id exists.
    NotFound,
}

impl SettleOutcome {
    /// The settled job, if the transition happened.
    pub fn settled(self) -> Option<Job> {
        match self {
            Self::Settled(job) => Some(job),
            _ => None,
        }
    }
}

/// Jobs touched by one expired-lease sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReapReport {
    /// Jobs moved back to `waiting`.
    pub requeued: Vec<JobId>,
    /// Jobs routed to `failed` because they ran out of attempts.
    pub failed: Vec<Job>,
}

impl ReapReport {
    /// Whether the sweep changed anything.
    pub fn is_empty(&self) -> bool {
        self.requeued.is_empty() && self.failed.is_empty()
    }
}

/// Number of jobs per status in one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Jobs waiting to be claimed.
    pub waiting: u64,
    /// Jobs currently claimed.
    pub active: u64,
    /// Jobs completed.
    pub completed: u64,
    /// Jobs failed.
    pub failed: u64,
}
