//! # relayq-store
//!
//! Job store implementations for relayq. Supports two backends:
//!
//! - **memory**: in-process store guarded by a single async mutex
//! - **redis**: Redis-backed store, every transition is one Lua script
//!
//! The backend is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod store;

pub use provider::StoreManager;
pub use store::JobStore;
