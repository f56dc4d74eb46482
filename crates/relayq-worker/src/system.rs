//! Wiring of store, producer, pool, reaper, and event subscribers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing;

use relayq_core::config::AppConfig;
use relayq_core::result::AppResult;
use relayq_core::types::id::JobId;
use relayq_entity::message::MESSAGE_JOB_NAME;
use relayq_events::{EventLogger, EventNotifier};
use relayq_store::StoreManager;

use crate::executor::{JobExecutor, JobHandler};
use crate::jobs::message::{MessageHandler, submit_message};
use crate::queue::JobQueue;
use crate::reaper::Reaper;
use crate::runner::{PoolMetricsSnapshot, PoolOptions, WorkerPool};

/// Everything that runs behind the submission boundary.
///
/// Built once at startup and shared by reference; `shutdown` is the only
/// way to stop the background tasks.
#[derive(Debug)]
pub struct JobSystem {
    queue: Arc<JobQueue>,
    notifier: EventNotifier,
    pool: Option<WorkerPool>,
    background: Mutex<Option<Background>>,
    shutdown: watch::Sender<bool>,
}

#[derive(Debug)]
struct Background {
    reaper: Reaper,
    logger: Option<EventLogger>,
}

impl JobSystem {
    /// Connect to the configured store and start with the built-in
    /// message handler.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let store = StoreManager::new(&config.store).await?;
        Ok(Self::start(config, store))
    }

    /// Start on top of `store` with the built-in message handler.
    pub fn start(config: &AppConfig, store: StoreManager) -> Self {
        let executor = JobExecutor::new().with_handler(
            MESSAGE_JOB_NAME,
            Arc::new(MessageHandler::new(Duration::from_millis(
                config.worker.simulated_latency_ms,
            ))),
        );
        tracing::info!(handlers = ?executor.registered_names(), "Registered job handlers");
        Self::with_handler(config, store, Arc::new(executor))
    }

    /// Start on top of `store`, running every job through `handler`.
    pub fn with_handler(
        config: &AppConfig,
        store: StoreManager,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        let queue = Arc::new(JobQueue::new(store, &config.queue, config.store.retry.clone()));
        let notifier = EventNotifier::from_config(&config.events);
        let (shutdown, _) = watch::channel(false);

        let logger = config
            .events
            .log_events
            .then(|| EventLogger::spawn(&notifier, shutdown.subscribe()));

        let reaper = Reaper::spawn(
            Arc::clone(&queue),
            config.queue.reaper_interval(),
            notifier.clone(),
            shutdown.subscribe(),
        );

        let pool = if config.worker.enabled {
            Some(WorkerPool::start(
                Arc::clone(&queue),
                PoolOptions::from_config(&config.queue, &config.worker),
                handler,
                notifier.clone(),
            ))
        } else {
            tracing::info!("Worker pool disabled, running as producer only");
            None
        };

        Self {
            queue,
            notifier,
            pool,
            background: Mutex::new(Some(Background { reaper, logger })),
            shutdown,
        }
    }

    /// The queue jobs are submitted to.
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    /// Event notifier, for additional subscribers.
    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    /// Pool counters, when the pool runs in this process.
    pub fn pool_metrics(&self) -> Option<PoolMetricsSnapshot> {
        self.pool.as_ref().map(|pool| pool.metrics().snapshot())
    }

    /// Validate and enqueue a message.
    pub async fn submit_message(&self, text: Option<&str>) -> AppResult<JobId> {
        submit_message(&self.queue, text).await
    }

    /// Stop the pool, then the reaper and event logger.
    pub async fn shutdown(&self, grace: Duration) {
        if let Some(pool) = &self.pool {
            pool.stop(grace).await;
        }

        self.shutdown.send_replace(true);
        if let Some(background) = self.background.lock().await.take() {
            background.reaper.join().await;
            if let Some(logger) = background.logger {
                logger.join().await;
            }
        }
        tracing::info!(queue = %self.queue.name(), "Job system stopped");
    }
}
