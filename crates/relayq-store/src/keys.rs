//! Store key builders for all relayq records.
//!
//! Keys are relative; the Redis client prepends the configured prefix.

/// List of waiting job ids, oldest first.
pub fn waiting(queue: &str) -> String {
    format!("queue:{queue}:waiting")
}

/// Sorted set of active job ids scored by lease deadline (epoch ms).
pub fn active(queue: &str) -> String {
    format!("queue:{queue}:active")
}

/// List of completed job ids in settlement order.
pub fn completed(queue: &str) -> String {
    format!("queue:{queue}:completed")
}

/// List of failed job ids in settlement order.
pub fn failed(queue: &str) -> String {
    format!("queue:{queue}:failed")
}

/// Prefix shared by all job hashes. Lua scripts append the id.
pub fn job_prefix() -> &'static str {
    "job:"
}

/// Hash holding one job record.
pub fn job(job_id: &str) -> String {
    format!("{}{job_id}", job_prefix())
}
