//! Integration tests driving the HTTP router over the in-memory store.

mod helpers;
mod message_test;
mod worker_flow_test;
