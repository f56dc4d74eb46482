//! In-memory job store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use relayq_core::error::AppError;
use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::job::{CreateJob, Job, JobStatus, QueueCounts, ReapReport, SettleOutcome};

use crate::store::{JobStore, exhausted_reason};

/// Per-queue membership.
#[derive(Debug, Default)]
struct QueueState {
    waiting: VecDeque<JobId>,
    active: HashSet<JobId>,
    completed: u64,
    failed: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    jobs: HashMap<JobId, Job>,
    queues: HashMap<String, QueueState>,
}

impl StoreState {
    fn queue_mut(&mut self, queue: &str) -> &mut QueueState {
        self.queues.entry(queue.to_string()).or_default()
    }

    /// Shared guard for settle/release: returns the job only when it is
    /// active under `worker_id`.
    fn claimed_job(
        &mut self,
        job_id: JobId,
        worker_id: &str,
    ) -> Result<&mut Job, SettleOutcome> {
        let job = self.jobs.get_mut(&job_id).ok_or(SettleOutcome::NotFound)?;
        if job.status.is_terminal() {
            return Err(SettleOutcome::AlreadyTerminal);
        }
        if !job.is_claimed_by(worker_id) {
            return Err(SettleOutcome::Stale);
        }
        Ok(job)
    }

    fn finish(
        &mut self,
        job_id: JobId,
        worker_id: &str,
        status: JobStatus,
        apply: impl FnOnce(&mut Job),
    ) -> SettleOutcome {
        let job = match self.claimed_job(job_id, worker_id) {
            Ok(job) => job,
            Err(outcome) => return outcome,
        };

        job.status = status;
        job.lease_expires_at = None;
        job.finished_at = Some(Utc::now());
        apply(job);
        let settled = job.clone();

        let queue = self.queue_mut(&settled.queue);
        queue.active.remove(&job_id);
        match status {
            JobStatus::Completed => queue.completed += 1,
            JobStatus::Failed => queue.failed += 1,
            _ => {}
        }

        SettleOutcome::Settled(settled)
    }
}

/// In-memory job store.
///
/// All state sits behind one async mutex, so every operation is a single
/// critical section and claims are trivially linearizable. Suitable for a
/// single process and for tests; nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, params: CreateJob) -> AppResult<JobId> {
        if params.queue.is_empty() {
            return Err(AppError::validation("queue name must not be empty"));
        }

        let id = JobId::new();
        let job = Job::new(id, params, Utc::now());

        let mut state = self.state.lock().await;
        state.queue_mut(&job.queue).waiting.push_back(id);
        state.jobs.insert(id, job);
        Ok(id)
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        visibility_timeout: Duration,
    ) -> AppResult<Option<Job>> {
        // Deadline first: queue state is only touched once the claim cannot fail.
        let now = Utc::now();
        let deadline = chrono::Duration::from_std(visibility_timeout)
            .ok()
            .and_then(|lease| now.checked_add_signed(lease))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "visibility timeout {visibility_timeout:?} is out of range"
                ))
            })?;

        let mut state = self.state.lock().await;

        let job_id = loop {
            let Some(job_id) = state.queue_mut(queue).waiting.pop_front() else {
                return Ok(None);
            };
            if state.jobs.contains_key(&job_id) {
                break job_id;
            }
            debug!(job_id = %job_id, queue, "Dropping waiting id without a record");
        };

        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::internal(format!("job {job_id} vanished during claim")))?;
        job.status = JobStatus::Active;
        job.attempts_made += 1;
        job.worker_id = Some(worker_id.to_string());
        job.started_at = Some(now);
        job.lease_expires_at = Some(deadline);

        let claimed = job.clone();
        state.queue_mut(queue).active.insert(job_id);

        debug!(job_id = %job_id, queue, worker_id, attempt = claimed.attempts_made, "Claimed job");
        Ok(Some(claimed))
    }

    async fn settle_completed(
        &self,
        job_id: JobId,
        worker_id: &str,
        return_value: Value,
    ) -> AppResult<SettleOutcome> {
        let mut state = self.state.lock().await;
        Ok(state.finish(job_id, worker_id, JobStatus::Completed, |job| {
            job.return_value = Some(return_value);
        }))
    }

    async fn settle_failed(
        &self,
        job_id: JobId,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<SettleOutcome> {
        let mut state = self.state.lock().await;
        Ok(state.finish(job_id, worker_id, JobStatus::Failed, |job| {
            job.failure_reason = Some(reason.to_string());
        }))
    }

    async fn release(
        &self,
        job_id: JobId,
        worker_id: &str,
        error: &str,
    ) -> AppResult<SettleOutcome> {
        let mut state = self.state.lock().await;
        let job = match state.claimed_job(job_id, worker_id) {
            Ok(job) => job,
            Err(outcome) => return Ok(outcome),
        };

        job.status = JobStatus::Waiting;
        job.worker_id = None;
        job.lease_expires_at = None;
        job.last_error = Some(error.to_string());
        let released = job.clone();

        let queue = state.queue_mut(&released.queue);
        queue.active.remove(&job_id);
        queue.waiting.push_back(job_id);

        Ok(SettleOutcome::Settled(released))
    }

    async fn requeue_expired(&self, queue: &str) -> AppResult<ReapReport> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let Some(active) = state.queues.get(queue).map(|q| q.active.clone()) else {
            return Ok(ReapReport::default());
        };

        let mut expired: Vec<Job> = active
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .filter(|job| job.lease_expired(now))
            .cloned()
            .collect();
        // Each push_front lands ahead of the previous one, so walk newest
        // deadline first to leave the oldest job at the head.
        expired.sort_by_key(|job| std::cmp::Reverse(job.lease_expires_at));

        let mut report = ReapReport::default();
        for stale in expired {
            let Some(job) = state.jobs.get_mut(&stale.id) else {
                continue;
            };
            job.lease_expires_at = None;

            if job.can_retry() {
                job.status = JobStatus::Waiting;
                job.worker_id = None;
                let id = job.id;
                let q = state.queue_mut(queue);
                q.active.remove(&id);
                q.waiting.push_front(id);
                report.requeued.push(id);
            } else {
                job.status = JobStatus::Failed;
                job.failure_reason = Some(exhausted_reason(job.max_attempts));
                job.finished_at = Some(now);
                let failed = job.clone();
                let q = state.queue_mut(queue);
                q.active.remove(&failed.id);
                q.failed += 1;
                report.failed.push(failed);
            }
        }

        Ok(report)
    }

    async fn get(&self, job_id: JobId) -> AppResult<Option<Job>> {
        let state = self.state.lock().await;
        Ok(state.jobs.get(&job_id).cloned())
    }

    async fn counts(&self, queue: &str) -> AppResult<QueueCounts> {
        let state = self.state.lock().await;
        Ok(state
            .queues
            .get(queue)
            .map(|q| QueueCounts {
                waiting: q.waiting.len() as u64,
                active: q.active.len() as u64,
                completed: q.completed,
                failed: q.failed,
            })
            .unwrap_or_default())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
