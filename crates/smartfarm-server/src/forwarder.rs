//! Best-effort webhook notification from the relay source.
//!
//! [`RelayForwarder::notify`] fires one POST per update on a background
//! task and returns immediately. Delivery failures are logged and dropped:
//! there is no retry and no outbound queue.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use smartfarm_core::RelayMessage;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::RelayError;

/// Sends [`RelayMessage`]s to a receiver's webhook.
#[derive(Debug, Clone)]
pub struct RelayForwarder {
    client: reqwest::Client,
    webhook_url: String,
}

impl RelayForwarder {
    /// Create a forwarder posting to `webhook_url` with a per-call `timeout`.
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    /// The receiver URL notifications are sent to.
    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// POST `message` and wait for the receiver's answer.
    pub async fn deliver(&self, message: &RelayMessage) -> Result<StatusCode, RelayError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .map_err(|e| RelayError::Request {
                url: self.webhook_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                url: self.webhook_url.clone(),
                status,
            });
        }
        Ok(status)
    }

    /// Deliver `message` on a background task; the outcome is only logged.
    pub fn notify(self: &Arc<Self>, message: RelayMessage) -> JoinHandle<()> {
        let forwarder = Arc::clone(self);
        tokio::spawn(async move {
            match forwarder.deliver(&message).await {
                Ok(status) => info!(
                    url = forwarder.webhook_url(),
                    status = status.as_u16(),
                    "Relay notification delivered"
                ),
                Err(e) => warn!(error = %e, "Relay notification failed"),
            }
        })
    }
}
