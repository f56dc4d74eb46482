//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use relayq_api::{AppState, build_app};
use relayq_core::config::AppConfig;
use relayq_core::error::AppError;
use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::job::{CreateJob, Job, QueueCounts, ReapReport, SettleOutcome};
use relayq_store::memory::MemoryJobStore;
use relayq_store::{JobStore, StoreManager};
use relayq_worker::JobSystem;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The running job system behind the router
    pub system: Arc<JobSystem>,
}

/// Response captured from the router
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// App with a short simulated latency and a running pool
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// App built from an explicit configuration
    pub fn with_config(config: AppConfig) -> Self {
        Self::with_store(config, StoreManager::in_memory())
    }

    /// App running on top of `store`
    pub fn with_store(config: AppConfig, store: StoreManager) -> Self {
        let system = Arc::new(JobSystem::start(&config, store));
        let router = build_app(AppState::new(config, Arc::clone(&system)));
        Self { router, system }
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body = match body {
            Some(json) => Body::from(json.to_string()),
            None => Body::empty(),
        };
        self.send(method, path, body).await
    }

    /// Send a raw body with a JSON content type
    pub async fn send(&self, method: &str, path: &str, body: Body) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Poll `GET /jobs/{id}` until the job reaches `status`
    pub async fn wait_for_status(&self, job_id: &str, status: &str) -> Value {
        let path = format!("/jobs/{job_id}");
        for _ in 0..100 {
            let response = self.request("GET", &path, None).await;
            if response.body["data"]["status"] == status {
                return response.body["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("job {job_id} never reached '{status}'");
    }

    /// Stop the pool and background tasks
    pub async fn shutdown(&self) {
        self.system.shutdown(Duration::from_secs(2)).await;
    }
}

/// Default configuration with fast timings
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.worker.simulated_latency_ms = 50;
    config.worker.poll_interval_ms = 50;
    config.events.log_events = false;
    config
}

/// Message returned by [`EnqueueDownStore`] on every enqueue.
pub const STORE_DOWN_MESSAGE: &str = "Failed to enqueue job: connection refused";

/// Memory store whose `enqueue` always fails as if the server were gone.
#[derive(Debug, Default)]
pub struct EnqueueDownStore {
    inner: MemoryJobStore,
}

#[async_trait]
impl JobStore for EnqueueDownStore {
    async fn enqueue(&self, _job: CreateJob) -> AppResult<JobId> {
        Err(AppError::store_unavailable(STORE_DOWN_MESSAGE))
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

    async fn release(
        &self,
        job_id: JobId,
        worker_id: &str,
        error: &str,
    ) -> AppResult<SettleOutcome> {
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
