//! Request handlers.

pub mod health;
pub mod job;
pub mod message;
pub mod queue;
