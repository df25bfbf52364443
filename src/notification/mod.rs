//! Delivery of formatted alerts to the push-notification service.
//!
//! The handler only depends on the [`Notifier`](crate::core::Notifier)
//! trait; [`ntfy::NtfyClient`] is the production implementation.
pub mod ntfy;

pub use ntfy::NtfyClient;
