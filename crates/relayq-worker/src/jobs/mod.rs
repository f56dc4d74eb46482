//! Built-in job handler implementations.

pub mod message;

pub use message::{MessageHandler, submit_message};
