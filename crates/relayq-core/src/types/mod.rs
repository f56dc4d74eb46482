//! Core type definitions used across the relayq workspace.

pub mod id;

pub use id::*;
