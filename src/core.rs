//! Core data structures and traits for the relay.
//!
//! The types here live only for the duration of a single request: an
//! [`InboundAlert`] is parsed from the caller's body, turned into a
//! [`Notification`], and handed to a [`Notifier`].

use crate::error::RelayError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The JSON body posted by the alert source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundAlert {
    /// Free-form alert text. The first line becomes the notification title.
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundAlert {
    /// Parses a request body. Anything other than a JSON object is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        let unexpected = match value {
            serde_json::Value::Object(map) => {
                return Ok(serde_json::from_value(serde_json::Value::Object(map))?)
            }
            serde_json::Value::Array(_) => Unexpected::Seq,
            serde_json::Value::String(_) => Unexpected::Other("string"),
            serde_json::Value::Bool(b) => Unexpected::Bool(b),
            serde_json::Value::Null => Unexpected::Unit,
            serde_json::Value::Number(_) => Unexpected::Other("number"),
        };
        Err(serde_json::Error::invalid_type(unexpected, &"a JSON object").into())
    }

    /// Returns the alert text, treating a missing or empty value as invalid.
    pub fn text(&self) -> Result<&str, RelayError> {
        match self.text.as_deref() {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(RelayError::MissingText),
        }
    }
}

/// Notification priority as understood by ntfy.
///
/// ntfy accepts levels 1 through 5. The relay emits `Default` (3) unless a
/// keyword rule raises it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Priority {
    Min,
    Low,
    Default,
    High,
    Max,
}

impl Priority {
    /// The numeric level sent over the wire.
    pub fn level(self) -> u8 {
        match self {
            Priority::Min => 1,
            Priority::Low => 2,
            Priority::Default => 3,
            Priority::High => 4,
            Priority::Max => 5,
        }
    }

    /// The display tag attached to notifications of this priority.
    pub fn tag(self) -> &'static str {
        match self {
            Priority::Max => "warning",
            _ => "information_source",
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.level()
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Priority::Min),
            2 => Ok(Priority::Low),
            3 => Ok(Priority::Default),
            4 => Ok(Priority::High),
            5 => Ok(Priority::Max),
            other => Err(format!("priority must be between 1 and 5, got {other}")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// The JSON body published to ntfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub topic: String,
    pub message: String,
    pub title: String,
    pub tags: Vec<String>,
    pub priority: Priority,
}

/// What ntfy answered.
#[derive(Debug, Clone)]
pub struct NotifierResponse {
    pub status: StatusCode,
    pub body: String,
}

/// A destination that notifications can be published to.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publishes a single notification and returns the raw response.
    ///
    /// Any response that makes it back over the wire is `Ok`, whatever its
    /// status code. Only transport failures are errors.
    async fn send(&self, notification: &Notification) -> Result<NotifierResponse, RelayError>;
}
