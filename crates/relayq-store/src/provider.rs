//! Store manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use relayq_core::config::store::StoreConfig;
use relayq_core::error::AppError;
use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::job::{CreateJob, Job, QueueCounts, ReapReport, SettleOutcome};

use crate::store::JobStore;

/// Handle to the configured job store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StoreManager {
    inner: Arc<dyn JobStore>,
}

impl StoreManager {
    /// Create the backend named by `config.provider`.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn JobStore> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis job store");
                Arc::new(crate::redis::RedisJobStore::connect(&config.redis).await?)
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory job store");
                Arc::new(crate::memory::MemoryJobStore::new())
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Wrap an existing store (for testing).
    pub fn from_store(store: Arc<dyn JobStore>) -> Self {
        Self { inner: store }
    }

    /// In-memory store, mainly for tests and local runs.
    #[cfg(feature = "memory")]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(crate::memory::MemoryJobStore::new()))
    }
}

#[async_trait]
impl JobStore for StoreManager {
    async fn enqueue(&self, job: CreateJob) -> AppResult<JobId> {
        self.inner.enqueue(job).await
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        visibility_timeout: Duration,
    ) -> AppResult<Option<Job>> {
        self.inner.claim_next(queue, worker_id, visibility_timeout).await
    }

    async fn settle_completed(
        &self,
        job_id: JobId,
        worker_id: &str,
        return_value: Value,
    ) -> AppResult<SettleOutcome> {
        self.inner.settle_completed(job_id, worker_id, return_value).await
    }

    async fn settle_failed(
        &self,
        job_id: JobId,
        worker_id: &str,
        reason: &str,
    ) -> AppResult<SettleOutcome> {
        self.inner.settle_failed(job_id, worker_id, reason).await
    }

    async fn release(&self, job_id: JobId, worker_id: &str, error: &str)
    -> AppResult<SettleOutcome> {
        self.inner.release(job_id, worker_id, error).await
    }

    async fn requeue_expired(&self, queue: &str) -> AppResult<ReapReport> {
        self.inner.requeue_expired(queue).await
    }

    async fn get(&self, job_id: JobId) -> AppResult<Option<Job>> {
        self.inner.get(job_id).await
    }

    async fn counts(&self, queue: &str) -> AppResult<QueueCounts> {
        self.inner.counts(queue).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
