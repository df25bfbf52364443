//! ntfy-relay - forwards webhook alerts to an ntfy server.
//!
//! An inbound `{"text": ...}` alert is split into a title and body, given a
//! priority and tag, published to ntfy, and answered with ntfy's status code.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod formatting;
pub mod internal_metrics;
pub mod notification;
pub mod priority;
pub mod server;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
pub use error::RelayError;
