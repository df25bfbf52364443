//! A client for publishing notifications to an ntfy server.

use crate::core::{Notification, Notifier, NotifierResponse};
use crate::error::RelayError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use tracing::{debug, error, info, instrument};

/// Publishes notifications with a JSON POST to the ntfy base URL.
///
/// The topic travels in the body, so the URL is used as configured. The
/// underlying `reqwest::Client` pools connections and is reused for every
/// request.
#[derive(Clone)]
pub struct NtfyClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl NtfyClient {
    /// Creates a new `NtfyClient`.
    pub fn new(base_url: Url, token: String) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    /// Creates an `NtfyClient` around an existing HTTP client.
    pub fn with_client(client: Client, base_url: Url, token: String) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl fmt::Debug for NtfyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtfyClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Notifier for NtfyClient {
    #[instrument(skip_all, fields(topic = %notification.topic, priority = %notification.priority))]
    async fn send(&self, notification: &Notification) -> Result<NotifierResponse, RelayError> {
        debug!(?notification, "Sending notification to ntfy");

        let response = self
            .client
            .post(self.base_url.clone())
            .bearer_auth(&self.token)
            .json(notification)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request to ntfy failed");
                RelayError::Upstream(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(status = %status, error = %e, "Failed to read ntfy response body");
            RelayError::Upstream(e)
        })?;
        info!(status = %status, body = %body.trim_end(), "ntfy response");

        Ok(NotifierResponse { status, body })
    }
}
