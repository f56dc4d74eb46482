//! # relayq-events
//!
//! Fan-out of job lifecycle events to in-process subscribers.
//!
//! Publishing never blocks the worker pool: events go into a bounded
//! broadcast channel and slow subscribers skip what they missed.

pub mod logger;
pub mod notifier;

pub use logger::EventLogger;
pub use notifier::EventNotifier;
