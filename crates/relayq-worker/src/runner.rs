//! Worker pool: a fixed set of slots that claim, execute, and settle jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing;

use relayq_core::config::queue::QueueConfig;
use relayq_core::config::worker::WorkerConfig;
use relayq_core::events::JobEvent;
use relayq_entity::job::{Job, SettleOutcome};
use relayq_events::EventNotifier;

use crate::executor::{HandlerError, JobHandler};
use crate::queue::JobQueue;

/// Shortest idle wait between claim attempts.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Pool tuning knobs.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Number of slots, and so the cap on jobs active at once.
    pub concurrency: usize,
    /// Lease recorded on every claim.
    pub visibility_timeout: Duration,
    /// How long an idle slot sleeps when nobody wakes it.
    pub poll_interval: Duration,
}

impl PoolOptions {
    /// Derive options from the queue and worker sections.
    pub fn from_config(queue: &QueueConfig, worker: &WorkerConfig) -> Self {
        Self {
            concurrency: worker.concurrency.max(1),
            visibility_timeout: queue.visibility_timeout(),
            poll_interval: worker.poll_interval(),
        }
        .normalized()
    }

    /// Raise zero knobs to their floor: at least one slot and a non-zero
    /// poll interval, so an idle slot never spins.
    pub fn normalized(mut self) -> Self {
        self.concurrency = self.concurrency.max(1);
        self.poll_interval = self.poll_interval.max(MIN_POLL_INTERVAL);
        self
    }
}

/// Counters shared by all slots of a pool.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    released: AtomicU64,
}

/// Point-in-time copy of [`PoolMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolMetricsSnapshot {
    /// Jobs claimed and not yet settled.
    pub in_flight: usize,
    /// Highest `in_flight` observed.
    pub peak_in_flight: usize,
    /// Jobs settled as completed by this pool.
    pub completed: u64,
    /// Jobs settled as failed by this pool.
    pub failed: u64,
    /// Jobs handed back for retry.
    pub released: u64,
}

impl PoolMetrics {
    fn job_started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn job_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Clear the gauge once no slot can run. Aborted slots never reach
    /// `job_finished`.
    fn clear_in_flight(&self) {
        self.in_flight.store(0, Ordering::SeqCst);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            in_flight: self.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
        }
    }
}

/// A running pool of worker slots draining one queue.
#[derive(Debug)]
pub struct WorkerPool {
    id: String,
    concurrency: usize,
    shutdown: watch::Sender<bool>,
    slots: Mutex<Vec<JoinHandle<()>>>,
    metrics: Arc<PoolMetrics>,
}

impl WorkerPool {
    /// Spawn `options.concurrency` slots. Must be called inside a runtime.
    pub fn start(
        queue: Arc<JobQueue>,
        options: PoolOptions,
        handler: Arc<dyn JobHandler>,
        notifier: EventNotifier,
    ) -> Self {
        let options = options.normalized();
        let id = pool_id();
        let concurrency = options.concurrency;
        let (shutdown, _) = watch::channel(false);
        let metrics = Arc::new(PoolMetrics::default());

        tracing::info!(
            pool_id = %id,
            queue = %queue.name(),
            concurrency,
            visibility_timeout_ms = options.visibility_timeout.as_millis() as u64,
            poll_interval_ms = options.poll_interval.as_millis() as u64,
            "Starting worker pool"
        );

        let slots = (0..concurrency)
            .map(|n| {
                let slot = Slot {
                    worker_id: format!("{id}:{n}"),
                    queue: Arc::clone(&queue),
                    handler: Arc::clone(&handler),
                    notifier: notifier.clone(),
                    metrics: Arc::clone(&metrics),
                    options: options.clone(),
                };
                tokio::spawn(slot.run(shutdown.subscribe()))
            })
            .collect();

        Self {
            id,
            concurrency,
            shutdown,
            slots: Mutex::new(slots),
            metrics,
        }
    }

    /// Pool identifier, the prefix of every slot's worker id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of slots.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Shared counters.
    pub fn metrics(&self) -> Arc<PoolMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Stop claiming and wait up to `grace` for in-flight jobs.
    ///
    /// Slots still running after the grace period are aborted; their jobs
    /// come back through the visibility timeout and the `in_flight` gauge
    /// is reset. Calling this twice is a
    /// no-op the second time.
    pub async fn stop(&self, grace: Duration) {
        self.shutdown.send_replace(true);

        let mut handles = std::mem::take(&mut *self.slots.lock().await);
        if handles.is_empty() {
            return;
        }

        tracing::info!(pool_id = %self.id, "Worker pool waiting for in-flight jobs");

        if time::timeout(grace, join_all(handles.iter_mut())).await.is_err() {
            tracing::warn!(
                pool_id = %self.id,
                grace_ms = grace.as_millis() as u64,
                "Grace period elapsed, aborting remaining slots"
            );
            // Finished handles were already consumed above.
            let remaining: Vec<_> = handles.into_iter().filter(|h| !h.is_finished()).collect();
            for handle in &remaining {
                handle.abort();
            }
            join_all(remaining).await;
            self.metrics.clear_in_flight();
        }

        tracing::info!(pool_id = %self.id, "Worker pool stopped");
    }
}

fn pool_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("pool-{}", &id[..8])
}

/// One execution slot. Holds at most one claimed job at a time.
struct Slot {
    worker_id: String,
    queue: Arc<JobQueue>,
    handler: Arc<dyn JobHandler>,
    notifier: EventNotifier,
    metrics: Arc<PoolMetrics>,
    options: PoolOptions,
}

impl Slot {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!(worker_id = %self.worker_id, "Worker slot started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self
                .queue
                .claim(&self.worker_id, self.options.visibility_timeout)
                .await
            {
                Ok(Some(job)) => self.process(job).await,
                Ok(None) => {
                    if self.idle(&mut shutdown).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(worker_id = %self.worker_id, error = %e, "Failed to claim job");
                    if self.idle(&mut shutdown).await {
                        break;
                    }
                }
            }
        }

        tracing::debug!(worker_id = %self.worker_id, "Worker slot stopped");
    }

    /// Wait for a wake-up, the poll interval, or shutdown. Returns `true`
    /// when the slot should exit.
    async fn idle(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
            _ = self.queue.notified() => false,
            _ = time::sleep(self.options.poll_interval) => false,
        }
    }

    async fn process(&self, job: Job) {
        self.metrics.job_started();
        tracing::debug!(
            worker_id = %self.worker_id,
            job_id = %job.id,
            job_name = %job.name,
            attempt = job.attempts_made,
            "Processing job"
        );

        let handler = Arc::clone(&self.handler);
        let task_job = job.clone();
        let result = match tokio::spawn(async move { handler.handle(&task_job).await }).await {
            Ok(result) => result,
            Err(join_err) => Err(HandlerError::Permanent(panic_reason(join_err))),
        };

        match result {
            Ok(value) => self.complete(&job, value).await,
            Err(err) if err.is_retryable() && job.can_retry() => self.retry(&job, &err).await,
            Err(err) => self.fail(&job, &err.to_string()).await,
        }

        self.metrics.job_finished();
    }

    async fn complete(&self, job: &Job, value: serde_json::Value) {
        match self.queue.complete(job.id, &self.worker_id, value).await {
            Ok(SettleOutcome::Settled(settled)) => {
                self.metrics.completed.fetch_add(1, Ordering::SeqCst);
                let processing_time_ms = settled.processing_time_ms().unwrap_or_default();
                tracing::info!(
                    job_id = %settled.id,
                    worker_id = %self.worker_id,
                    processing_time_ms,
                    "Job completed"
                );
                self.notifier.publish(
                    self.queue.name(),
                    JobEvent::Completed {
                        job_id: settled.id,
                        result: settled.return_value.unwrap_or_default(),
                        processing_time_ms,
                    },
                );
            }
            Ok(outcome) => log_unsettled(job, &self.worker_id, &outcome),
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to mark job as completed");
            }
        }
    }

    async fn fail(&self, job: &Job, reason: &str) {
        match self.queue.fail(job.id, &self.worker_id, reason).await {
            Ok(SettleOutcome::Settled(settled)) => {
                self.metrics.failed.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(
                    job_id = %settled.id,
                    worker_id = %self.worker_id,
                    attempts_made = settled.attempts_made,
                    reason,
                    "Job failed"
                );
                self.notifier.publish(
                    self.queue.name(),
                    JobEvent::Failed {
                        job_id: settled.id,
                        error_message: reason.to_string(),
                        attempts_made: settled.attempts_made,
                    },
                );
            }
            Ok(outcome) => log_unsettled(job, &self.worker_id, &outcome),
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to mark job as failed");
            }
        }
    }

    async fn retry(&self, job: &Job, err: &HandlerError) {
        let message = err.to_string();
        match self.queue.release(job.id, &self.worker_id, &message).await {
            Ok(SettleOutcome::Settled(_)) => {
                self.metrics.released.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(
                    job_id = %job.id,
                    attempt = job.attempts_made,
                    max_attempts = job.max_attempts,
                    error = %message,
                    "Job failed, released for retry"
                );
            }
            Ok(outcome) => log_unsettled(job, &self.worker_id, &outcome),
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to release job");
            }
        }
    }
}

fn log_unsettled(job: &Job, worker_id: &str, outcome: &SettleOutcome) {
    let outcome = match outcome {
        SettleOutcome::Settled(_) => return,
        SettleOutcome::AlreadyTerminal => "already_terminal",
        SettleOutcome::Stale => "stale",
        SettleOutcome::NotFound => "not_found",
    };
    tracing::warn!(job_id = %job.id, worker_id, outcome, "Settle skipped");
}

fn panic_reason(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "job handler was cancelled".to_string();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("job handler panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use relayq_core::config::store::RetryConfig;
    use relayq_core::events::EventEnvelope;
    use relayq_entity::job::JobStatus;
    use relayq_store::StoreManager;
    use serde_json::{Value, json};
    use tokio::sync::broadcast;

    use crate::executor::handler_fn;

    fn queue() -> Arc<JobQueue> {
        let config = QueueConfig {
            max_attempts: 2,
            ..Default::default()
        };
        Arc::new(JobQueue::new(
            StoreManager::in_memory(),
            &config,
            RetryConfig::default(),
        ))
    }

    fn options(concurrency: usize) -> PoolOptions {
        PoolOptions {
            concurrency,
            visibility_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
        }
    }

    async fn next_event(rx: &mut broadcast::Receiver<EventEnvelope>) -> JobEvent {
        time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("notifier open")
            .event
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_completed_job_emits_event_with_processing_time() {
        let queue = queue();
        let notifier = EventNotifier::new(16);
        let mut events = notifier.subscribe();
        let handler = handler_fn(|_job: Job| async move {
            time::sleep(Duration::from_millis(1000)).await;
            Ok(json!({"processed": true}))
        });
        let pool = WorkerPool::start(queue.clone(), options(1), handler, notifier);

        let id = queue.enqueue("new-message", json!({"text": "hello"})).await.unwrap();

        match next_event(&mut events).await {
            JobEvent::Completed {
                job_id,
                result,
                processing_time_ms,
            } => {
                assert_eq!(job_id, id);
                assert_eq!(result, json!({"processed": true}));
                assert!((1000..1500).contains(&processing_time_ms), "{processing_time_ms}");
            }
            other => panic!("unexpected event {other:?}"),
        }

        let job = queue.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        pool.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_is_recorded_and_pool_continues() {
        let queue = queue();
        let notifier = EventNotifier::new(16);
        let mut events = notifier.subscribe();
        let handler = handler_fn(|job: Job| async move {
            if job.payload["fail"] == json!(true) {
                Err(HandlerError::permanent("boom"))
            } else {
                Ok(Value::Null)
            }
        });
        let pool = WorkerPool::start(queue.clone(), options(1), handler, notifier);

        let bad = queue.enqueue("new-message", json!({"fail": true})).await.unwrap();
        let good = queue.enqueue("new-message", json!({"fail": false})).await.unwrap();

        assert_eq!(
            next_event(&mut events).await,
            JobEvent::Failed {
                job_id: bad,
                error_message: "boom".to_string(),
                attempts_made: 1,
            }
        );
        assert_eq!(next_event(&mut events).await.job_id(), good);

        let failed = queue.get(bad).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.failure_reason.as_deref(), Some("boom"));
        pool.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_panic_fails_the_job() {
        let queue = queue();
        let notifier = EventNotifier::new(16);
        let mut events = notifier.subscribe();
        let handler = handler_fn(|_job: Job| async move {
            if true {
                panic!("handler exploded");
            }
            Ok(Value::Null)
        });
        let pool = WorkerPool::start(queue.clone(), options(1), handler, notifier);

        queue.enqueue("new-message", Value::Null).await.unwrap();
        match next_event(&mut events).await {
            JobEvent::Failed { error_message, .. } => {
                assert_eq!(error_message, "job handler panicked: handler exploded");
            }
            other => panic!("unexpected event {other:?}"),
        }
        pool.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_transient_failure_retries_until_cap() {
        let queue = queue();
        let notifier = EventNotifier::new(16);
        let mut events = notifier.subscribe();
        let handler = handler_fn(|_job: Job| async move { Err(HandlerError::transient("busy")) });
        let pool = WorkerPool::start(queue.clone(), options(1), handler, notifier);

        let id = queue.enqueue("new-message", Value::Null).await.unwrap();
        match next_event(&mut events).await {
            JobEvent::Failed {
                job_id,
                attempts_made,
                ..
            } => {
                assert_eq!(job_id, id);
                assert_eq!(attempts_made, 2);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(pool.metrics().snapshot().released, 1);
        pool.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_slots_run_jobs_in_parallel() {
        let queue = queue();
        let notifier = EventNotifier::new(16);
        let mut events = notifier.subscribe();
        let handler = handler_fn(|_job: Job| async move {
            time::sleep(Duration::from_millis(300)).await;
            Ok(Value::Null)
        });
        let pool = WorkerPool::start(queue.clone(), options(2), handler, notifier);

        let started = Instant::now();
        queue.enqueue("new-message", Value::Null).await.unwrap();
        queue.enqueue("new-message", Value::Null).await.unwrap();

        // both must be active before either completes
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(queue.counts().await.unwrap().active, 2);

        next_event(&mut events).await;
        next_event(&mut events).await;
        assert!(started.elapsed() < Duration::from_millis(550));
        assert_eq!(pool.metrics().snapshot().peak_in_flight, 2);
        pool.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_never_exceeds_concurrency() {
        let queue = queue();
        let notifier = EventNotifier::new(64);
        let mut events = notifier.subscribe();
        let handler = handler_fn(|_job: Job| async move {
            time::sleep(Duration::from_millis(20)).await;
            Ok(Value::Null)
        });
        let pool = WorkerPool::start(queue.clone(), options(3), handler, notifier);

        for _ in 0..20 {
            queue.enqueue("new-message", Value::Null).await.unwrap();
        }
        for _ in 0..20 {
            next_event(&mut events).await;
        }

        pool.stop(Duration::from_secs(1)).await;
        let metrics = pool.metrics().snapshot();
        assert_eq!(metrics.completed, 20);
        assert!(metrics.peak_in_flight <= 3);
        assert_eq!(metrics.in_flight, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_lets_in_flight_job_finish() {
        let queue = queue();
        let notifier = EventNotifier::new(16);
        let handler = handler_fn(|_job: Job| async move {
            time::sleep(Duration::from_millis(200)).await;
            Ok(Value::Null)
        });
        let pool = WorkerPool::start(queue.clone(), options(1), handler, notifier);

        let id = queue.enqueue("new-message", Value::Null).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        pool.stop(Duration::from_secs(2)).await;

        let job = queue.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        // nothing is claimed after stop
        let later = queue.enqueue("new-message", Value::Null).await.unwrap();
        time::sleep(Duration::from_millis(100)).await;
        let job = queue.get(later).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Waiting);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stop_aborts_after_grace() {
        let queue = queue();
        let notifier = EventNotifier::new(16);
        let handler = handler_fn(|_job: Job| async move {
            time::sleep(Duration::from_secs(30)).await;
            Ok(Value::Null)
        });
        let pool = WorkerPool::start(queue.clone(), options(1), handler, notifier);

        let id = queue.enqueue("new-message", Value::Null).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        pool.stop(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(2));

        // left active, the reaper returns it once the lease runs out
        let job = queue.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(pool.metrics().snapshot().in_flight, 0);
    }

    #[test]
    fn test_options_raise_zero_knobs() {
        let options = PoolOptions {
            concurrency: 0,
            visibility_timeout: Duration::from_secs(30),
            poll_interval: Duration::ZERO,
        }
        .normalized();
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.poll_interval, MIN_POLL_INTERVAL);

        let tuned = PoolOptions {
            concurrency: 4,
            visibility_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
        }
        .normalized();
        assert_eq!(tuned.concurrency, 4);
        assert_eq!(tuned.poll_interval, Duration::from_millis(250));
    }
}
