//! Job domain entities.

pub mod model;
pub mod outcome;
pub mod status;

pub use model::{CreateJob, Job};
pub use outcome::{QueueCounts, ReapReport, SettleOutcome};
pub use status::JobStatus;
