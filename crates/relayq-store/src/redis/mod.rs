//! Redis job store backend.

pub mod client;
pub mod codec;
pub mod operations;
pub mod scripts;

pub use client::RedisClient;
pub use operations::RedisJobStore;
