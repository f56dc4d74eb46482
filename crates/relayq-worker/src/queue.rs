//! Producer and store client for one named queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Notify, futures::Notified};
use tracing;

use relayq_core::config::queue::QueueConfig;
use relayq_core::config::store::RetryConfig;
use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::job::{CreateJob, Job, QueueCounts, ReapReport, SettleOutcome};
use relayq_store::{JobStore, StoreManager};

/// Handle to one queue in the job store.
///
/// Enqueues are fire-and-forget and surface store failures to the caller.
/// Claim, settle, and release calls made by the pool are retried with
/// exponential backoff while the store reports itself unavailable.
#[derive(Debug, Clone)]
pub struct JobQueue {
    store: StoreManager,
    name: String,
    max_attempts: u32,
    retry: RetryConfig,
    wake: Arc<Notify>,
}

impl JobQueue {
    /// Create a queue handle
    pub fn new(store: StoreManager, config: &QueueConfig, retry: RetryConfig) -> Self {
        Self {
            store,
            name: config.name.clone(),
            max_attempts: config.max_attempts,
            retry,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Queue name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying store
    pub fn store(&self) -> &StoreManager {
        &self.store
    }

    /// Append a job and wake one idle slot.
    pub async fn enqueue(&self, name: &str, payload: Value) -> AppResult<JobId> {
        let job_id = self
            .store
            .enqueue(CreateJob {
                queue: self.name.clone(),
                name: name.to_string(),
                payload,
                max_attempts: self.max_attempts,
            })
            .await?;

        tracing::debug!(job_id = %job_id, queue = %self.name, job_name = name, "Enqueued job");
        self.wake.notify_one();
        Ok(job_id)
    }

    /// Resolves when a job may have become available.
    pub fn notified(&self) -> Notified<'_> {
        self.wake.notified()
    }

    /// Wake up to `count` idle slots.
    pub fn wake(&self, count: usize) {
        for _ in 0..count {
            self.wake.notify_one();
        }
    }

    /// Claim the next waiting job for `worker_id`
    pub async fn claim(
        &self,
        worker_id: &str,
        visibility_timeout: Duration,
    ) -> AppResult<Option<Job>> {
        self.with_retry("claim", || {
            self.store.claim_next(&self.name, worker_id, visibility_timeout)
        })
        .await
    }

    /// Settle a job as completed
    pub async fn complete(
        &self,
        job_id: JobId,
        worker_id: &str,
        value: Value,
    ) -> AppResult<SettleOutcome> {
        self.with_retry("complete", || {
            self.store.settle_completed(job_id, worker_id, value.clone())
        })
        .await
    }

    /// Settle a job as failed
    pub async fn fail(
        &self,
        job_id: JobId,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<SettleOutcome> {
        self.with_retry("fail", || self.store.settle_failed(job_id, worker_id, reason))
            .await
    }

    /// Put a job back for another attempt
    pub async fn release(
        &self,
        job_id: JobId,
        worker_id: &str,
        error: &str,
    ) -> AppResult<SettleOutcome> {
        let outcome = self
            .with_retry("release", || self.store.release(job_id, worker_id, error))
            .await?;
        if matches!(outcome, SettleOutcome::Settled(_)) {
            self.wake.notify_one();
        }
        Ok(outcome)
    }

    /// Revert jobs whose lease expired
    pub async fn requeue_expired(&self) -> AppResult<ReapReport> {
        self.store.requeue_expired(&self.name).await
    }

    /// Look up a job
    pub async fn get(&self, job_id: JobId) -> AppResult<Option<Job>> {
        self.store.get(job_id).await
    }

    /// Job counts per status
    pub async fn counts(&self) -> AppResult<QueueCounts> {
        self.store.counts(&self.name).await
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        queue = %self.name,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Store call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use relayq_core::error::AppError;
    use relayq_store::memory::MemoryJobStore;

    fn queue_with(store: StoreManager) -> JobQueue {
        let retry = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        JobQueue::new(store, &QueueConfig::default(), retry)
    }

    /// Memory store whose claims fail a fixed number of times first.
    #[derive(Debug)]
    struct FlakyStore {
        inner: MemoryJobStore,
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl JobStore for FlakyStore {
        async fn enqueue(&self, job: CreateJob) -> AppResult<JobId> {
            self.inner.enqueue(job).await
        }
        async fn claim_next(
            &self,
            queue: &str,
            worker_id: &str,
            lease: Duration,
        ) -> AppResult<Option<Job>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(AppError::store_unavailable("connection reset"));
            }
            self.inner.claim_next(queue, worker_id, lease).await
        }
        async fn settle_completed(&self, id: JobId, w: &str, v: Value) -> AppResult<SettleOutcome> {
            self.inner.settle_completed(id, w, v).await
        }
        async fn settle_failed(&self, id: JobId, w: &str, r: &str) -> AppResult<SettleOutcome> {
            self.inner.settle_failed(id, w, r).await
        }
        async fn release(&self, id: JobId, w: &str, e: &str) -> AppResult<SettleOutcome> {
            self.inner.release(id, w, e).await
        }
        async fn requeue_expired(&self, queue: &str) -> AppResult<ReapReport> {
            self.inner.requeue_expired(queue).await
        }
        async fn get(&self, id: JobId) -> AppResult<Option<Job>> {
            self.inner.get(id).await
        }
        async fn counts(&self, queue: &str) -> AppResult<QueueCounts> {
            self.inner.counts(queue).await
        }
        async fn health_check(&self) -> AppResult<bool> {
            Ok(true)
        }
    }

    fn flaky(failures: u32) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: MemoryJobStore::new(),
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn test_enqueue_records_attempt_cap() {
        let queue = queue_with(StoreManager::in_memory());
        let id = queue.enqueue("new-message", serde_json::json!({"text": "hi"})).await.unwrap();

        let job = queue.get(id).await.unwrap().unwrap();
        assert_eq!(job.queue, "messageQueue");
        assert_eq!(job.max_attempts, 3);
        assert_eq!(queue.counts().await.unwrap().waiting, 1);
    }

    #[tokio::test]
    async fn test_enqueue_wakes_a_waiter() {
        let queue = queue_with(StoreManager::in_memory());
        queue.enqueue("new-message", Value::Null).await.unwrap();
        // the stored permit resolves the next wait immediately
        tokio::time::timeout(Duration::from_millis(100), queue.notified())
            .await
            .expect("enqueue should leave a wake-up permit");
    }

    #[tokio::test]
    async fn test_claim_retries_transient_store_failures() {
        let store = flaky(2);
        let queue = queue_with(StoreManager::from_store(store.clone()));
        queue.enqueue("new-message", Value::Null).await.unwrap();

        let job = queue.claim("w1", Duration::from_secs(30)).await.unwrap();
        assert!(job.is_some());
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_claim_gives_up_after_max_retries() {
        let store = flaky(10);
        let queue = queue_with(StoreManager::from_store(store.clone()));

        let err = queue.claim("w1", Duration::from_secs(30)).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.calls.load(Ordering::SeqCst), 4);
    }
}
