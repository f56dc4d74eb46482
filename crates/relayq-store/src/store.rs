//! The job store contract.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::job::{CreateJob, Job, QueueCounts, ReapReport, SettleOutcome};

/// Durable shared structure holding jobs per named queue.
///
/// Implementations own every status transition and must make each one
/// atomic with respect to concurrent callers. In particular two callers of
/// [`JobStore::claim_next`] must never receive the same job while it is
/// active.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Append a new `waiting` job to the tail of its queue.
    async fn enqueue(&self, job: CreateJob) -> AppResult<JobId>;

    /// Claim the oldest `waiting` job of `queue` for `worker_id`.
    ///
    /// The job becomes `active`, its attempt counter is incremented and a
    /// lease of `visibility_timeout` is recorded. Returns `None` without
    /// waiting when the queue is empty.
    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        visibility_timeout: Duration,
    ) -> AppResult<Option<Job>>;

    /// Transition a job claimed by `worker_id` to `completed`.
    async fn settle_completed(
        &self,
        job_id: JobId,
        worker_id: &str,
        return_value: Value,
    ) -> AppResult<SettleOutcome>;

    /// Transition a job claimed by `worker_id` to `failed`.
    async fn settle_failed(
        &self,
        job_id: JobId,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<SettleOutcome>;

    /// Put a job claimed by `worker_id` back at the tail of its queue so
    /// it can be retried. `error` is kept as the job's last error.
    async fn release(&self, job_id: JobId, worker_id: &str, error: &str)
    -> AppResult<SettleOutcome>;

    /// Revert every active job of `queue` whose lease expired.
    ///
    /// Jobs with attempts left go back to the front of the queue, the rest
    /// are routed to `failed`.
    async fn requeue_expired(&self, queue: &str) -> AppResult<ReapReport>;

    /// Look up a job by id.
    async fn get(&self, job_id: JobId) -> AppResult<Option<Job>>;

    /// Count jobs per status in `queue`.
    async fn counts(&self, queue: &str) -> AppResult<QueueCounts>;

    /// Check that the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Failure reason recorded when the reaper gives up on a job.
pub fn exhausted_reason(max_attempts: u32) -> String {
    format!("job exceeded max attempts ({max_attempts}) without settling")
}
