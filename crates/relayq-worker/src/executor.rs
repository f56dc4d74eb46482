//! Job handlers and the executor that dispatches to them.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use relayq_core::error::AppError;
use relayq_entity::job::Job;

/// Processes one delivery of a job.
///
/// Handlers run inside their own task, so they may await freely without
/// holding up other slots. A panic is treated as a permanent failure.
#[async_trait]
pub trait JobHandler: Send + Sync + fmt::Debug + 'static {
    /// Execute the job and return the value stored on completion.
    async fn handle(&self, job: &Job) -> Result<Value, HandlerError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Permanent failure, the job is failed immediately
    #[error("{0}")]
    Permanent(String),

    /// Transient failure, the job is retried while attempts remain
    #[error("{0}")]
    Transient(String),

    /// Internal error, treated as permanent
    #[error("{0}")]
    Internal(#[from] AppError),
}

impl HandlerError {
    /// Create a permanent failure.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    /// Create a transient failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Whether another delivery may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Dispatches jobs to the handler registered for their name
#[derive(Debug, Default)]
pub struct JobExecutor {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create an executor with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for jobs named `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let name = name.into();
        tracing::info!(job_name = %name, "Registered job handler");
        self.handlers.insert(name, handler);
    }

    /// Builder form of [`JobExecutor::register`]
    pub fn with_handler(mut self, name: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        self.register(name, handler);
        self
    }

    /// Check if a handler is registered for a job name
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered job names, sorted
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl JobHandler for JobExecutor {
    async fn handle(&self, job: &Job) -> Result<Value, HandlerError> {
        let handler = self.handlers.get(&job.name).ok_or_else(|| {
            HandlerError::Permanent(format!("No handler registered for job '{}'", job.name))
        })?;

        tracing::debug!(
            job_id = %job.id,
            job_name = %job.name,
            attempt = job.attempts_made,
            max_attempts = job.max_attempts,
            "Executing job"
        );

        handler.handle(job).await
    }
}

/// Handler backed by an async closure.
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Wrap an async closure taking the job by value as a [`JobHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn JobHandler>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn handle(&self, job: &Job) -> Result<Value, HandlerError> {
        (self.f)(job.clone()).await
    }
}
