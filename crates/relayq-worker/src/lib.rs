//! Background job processing for relayq.
//!
//! This crate provides:
//! - A producer and store client ([`JobQueue`]) with retry on store failures
//! - A worker pool that claims, executes, and settles jobs with bounded
//!   parallelism
//! - A reaper that returns jobs with expired leases to the queue
//! - A job executor that dispatches jobs to handlers by name
//! - The built-in message job

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod reaper;
pub mod runner;
pub mod system;

pub use executor::{HandlerError, JobExecutor, JobHandler, handler_fn};
pub use queue::JobQueue;
pub use reaper::Reaper;
pub use runner::{PoolMetrics, PoolOptions, WorkerPool};
pub use system::JobSystem;
