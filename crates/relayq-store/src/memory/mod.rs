//! In-process job store backend.

pub mod store;

pub use store::MemoryJobStore;
