//! Redis-backed [`JobStore`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, Script};
use serde_json::Value;
use tracing::{debug, error};

use relayq_core::config::store::RedisStoreConfig;
use relayq_core::error::AppError;
use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::job::{CreateJob, Job, JobStatus, QueueCounts, ReapReport, SettleOutcome};

use super::client::{RedisClient, store_error};
use super::{codec, scripts};
use crate::keys;
use crate::store::JobStore;

/// Job store keeping every queue in Redis.
///
/// Waiting and terminal jobs live in lists, active jobs in a sorted set
/// scored by lease deadline, and each job in its own hash. Status
/// transitions run as Lua scripts so they are atomic across processes.
#[derive(Debug, Clone)]
pub struct RedisJobStore {
    client: RedisClient,
    claim: Script,
    settle: Script,
    release: Script,
    reap: Script,
}

impl RedisJobStore {
    /// Connect to Redis and prepare the transition scripts.
    pub async fn connect(config: &RedisStoreConfig) -> AppResult<Self> {
        let client = RedisClient::connect(config).await?;
        Ok(Self::with_client(client))
    }

    /// Build a store on top of an existing client.
    pub fn with_client(client: RedisClient) -> Self {
        Self {
            client,
            claim: Script::new(scripts::CLAIM),
            settle: Script::new(scripts::SETTLE),
            release: Script::new(scripts::RELEASE),
            reap: Script::new(scripts::REAP),
        }
    }

    fn key(&self, relative: &str) -> String {
        self.client.prefixed_key(relative)
    }

    fn job_key_prefix(&self) -> String {
        self.key(keys::job_prefix())
    }

    async fn load(&self, job_id: &str) -> AppResult<Option<Job>> {
        let mut conn = self.client.conn();
        let fields: HashMap<String, String> = conn
            .hgetall(self.key(&keys::job(job_id)))
            .await
            .map_err(|e| store_error("Failed to read job", e))?;
        codec::from_fields(&fields)
    }

    async fn settle_terminal(
        &self,
        job_id: JobId,
        worker_id: &str,
        status: JobStatus,
        field: &str,
        value: String,
    ) -> AppResult<SettleOutcome> {
        let id = job_id.to_string();
        let (queue, target) = match self.load(&id).await? {
            Some(job) => {
                let target = match status {
                    JobStatus::Completed => keys::completed(&job.queue),
                    _ => keys::failed(&job.queue),
                };
                (job.queue, target)
            }
            None => return Ok(SettleOutcome::NotFound),
        };

        let mut conn = self.client.conn();
        let code: i64 = self
            .settle
            .key(self.key(&keys::job(&id)))
            .key(self.key(&keys::active(&queue)))
            .key(self.key(&target))
            .arg(worker_id)
            .arg(status.as_str())
            .arg(field)
            .arg(value)
            .arg(Utc::now().to_rfc3339())
            .arg(&id)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| store_error("Settle script failed", e))?;

        self.outcome(code, &id).await
    }

    async fn outcome(&self, code: i64, job_id: &str) -> AppResult<SettleOutcome> {
        match code {
            1 => match self.load(job_id).await? {
                Some(job) => Ok(SettleOutcome::Settled(job)),
                None => Ok(SettleOutcome::NotFound),
            },
            0 => Ok(SettleOutcome::AlreadyTerminal),
            -1 => Ok(SettleOutcome::NotFound),
            -2 => Ok(SettleOutcome::Stale),
            other => {
                error!(result = other, job_id, "Unexpected transition script result");
                Err(AppError::internal(format!(
                    "Unexpected transition result: {other}"
                )))
            }
        }
    }
}

/// Lease deadline in epoch milliseconds, or a validation error when the
/// timeout does not fit the score range.
fn lease_deadline_ms(now_ms: i64, visibility_timeout: Duration) -> AppResult<i64> {
    i64::try_from(visibility_timeout.as_millis())
        .ok()
        .and_then(|lease| now_ms.checked_add(lease))
        .ok_or_else(|| {
            AppError::validation(format!(
                "visibility timeout {visibility_timeout:?} is out of range"
            ))
        })
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn enqueue(&self, params: CreateJob) -> AppResult<JobId> {
        if params.queue.is_empty() {
            return Err(AppError::validation("queue name must not be empty"));
        }

        let job = Job::new(JobId::new(), params, Utc::now());
        let id = job.id.to_string();
        let fields = codec::to_fields(&job)?;

        let mut conn = self.client.conn();
        redis::pipe()
            .atomic()
            .hset_multiple(self.key(&keys::job(&id)), &fields)
            .ignore()
            .rpush(self.key(&keys::waiting(&job.queue)), &id)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_error("Failed to enqueue job", e))?;

        debug!(job_id = %id, queue = %job.queue, "Enqueued job");
        Ok(job.id)
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        visibility_timeout: Duration,
    ) -> AppResult<Option<Job>> {
        let now = Utc::now();
        let deadline = lease_deadline_ms(now.timestamp_millis(), visibility_timeout)?;

        let mut conn = self.client.conn();
        let fields: Option<HashMap<String, String>> = self
            .claim
            .key(self.key(&keys::waiting(queue)))
            .key(self.key(&keys::active(queue)))
            .arg(self.job_key_prefix())
            .arg(worker_id)
            .arg(now.to_rfc3339())
            .arg(deadline)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| store_error("Claim script failed", e))?;

        match fields {
            Some(fields) => codec::from_fields(&fields),
            None => Ok(None),
        }
    }

    async fn settle_completed(
        &self,
        job_id: JobId,
        worker_id: &str,
        return_value: Value,
    ) -> AppResult<SettleOutcome> {
        let encoded = serde_json::to_string(&return_value)?;
        self.settle_terminal(job_id, worker_id, JobStatus::Completed, "return_value", encoded)
            .await
    }

    async fn settle_failed(
        &self,
        job_id: JobId,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<SettleOutcome> {
        self.settle_terminal(
            job_id,
            worker_id,
            JobStatus::Failed,
            "failure_reason",
            reason.to_string(),
        )
        .await
    }

    async fn release(
        &self,
        job_id: JobId,
        worker_id: &str,
        error: &str,
    ) -> AppResult<SettleOutcome> {
        let id = job_id.to_string();
        let Some(job) = self.load(&id).await? else {
            return Ok(SettleOutcome::NotFound);
        };

        let mut conn = self.client.conn();
        let code: i64 = self
            .release
            .key(self.key(&keys::job(&id)))
            .key(self.key(&keys::active(&job.queue)))
            .key(self.key(&keys::waiting(&job.queue)))
            .arg(worker_id)
            .arg(error)
            .arg(&id)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| store_error("Release script failed", e))?;

        self.outcome(code, &id).await
    }

    async fn requeue_expired(&self, queue: &str) -> AppResult<ReapReport> {
        let now = Utc::now();

        let mut conn = self.client.conn();
        let (requeued, failed): (Vec<String>, Vec<String>) = self
            .reap
            .key(self.key(&keys::active(queue)))
            .key(self.key(&keys::waiting(queue)))
            .key(self.key(&keys::failed(queue)))
            .arg(self.job_key_prefix())
            .arg(now.timestamp_millis())
            .arg(now.to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| store_error("Reap script failed", e))?;

        let mut report = ReapReport::default();
        for id in requeued {
            match id.parse::<JobId>() {
                Ok(job_id) => report.requeued.push(job_id),
                Err(e) => error!(job_id = %id, error = %e, "Skipping corrupt job id"),
            }
        }
        for id in failed {
            if let Some(job) = self.load(&id).await? {
                report.failed.push(job);
            }
        }

        Ok(report)
    }

    async fn get(&self, job_id: JobId) -> AppResult<Option<Job>> {
        self.load(&job_id.to_string()).await
    }

    async fn counts(&self, queue: &str) -> AppResult<QueueCounts> {
        let mut conn = self.client.conn();
        let (waiting, active, completed, failed): (u64, u64, u64, u64) = redis::pipe()
            .llen(self.key(&keys::waiting(queue)))
            .zcard(self.key(&keys::active(queue)))
            .llen(self.key(&keys::completed(queue)))
            .llen(self.key(&keys::failed(queue)))
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("Failed to count jobs", e))?;

        Ok(QueueCounts {
            waiting,
            active,
            completed,
            failed,
        })
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("Redis health check failed", e))?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayq_core::error::ErrorKind;

    #[test]
    fn test_lease_deadline_adds_timeout() {
        let deadline = lease_deadline_ms(1_000, Duration::from_secs(30)).unwrap();
        assert_eq!(deadline, 31_000);
    }

    #[test]
    fn test_lease_deadline_rejects_overflow() {
        let err = lease_deadline_ms(1_000, Duration::from_secs(u64::MAX / 2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = lease_deadline_ms(i64::MAX - 10, Duration::from_millis(20)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
