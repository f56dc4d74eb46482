//! # relayq-core
//!
//! Core crate for relayq. Contains configuration schemas, typed
//! identifiers, job lifecycle events, and the unified error system.
//!
//! This crate has **no** internal dependencies on other relayq crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
