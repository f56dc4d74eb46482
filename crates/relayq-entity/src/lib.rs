//! # relayq-entity
//!
//! Domain entity models for relayq. Every struct here is either a record
//! held by the job store or a value object passed across the store
//! contract. All entities derive `Debug`, `Clone`, `Serialize` and
//! `Deserialize`.

pub mod job;
pub mod message;

pub use job::{CreateJob, Job, JobStatus, QueueCounts, ReapReport, SettleOutcome};
pub use message::MessagePayload;
