//! Receiver-side polling of the relay source.
//!
//! In poll mode the receiver GETs the source's query endpoint on a fixed
//! interval and replaces its held value with whatever message comes back.
//! A failed poll keeps the previous value.

use std::sync::Arc;
use std::time::Duration;

use smartfarm_core::{LatestValue, ReceivedValue, RelayMessage};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RelayError;

/// Shortest poll period a poller will run with.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically fetches the source's current [`RelayMessage`].
#[derive(Debug)]
pub struct RelayPoller {
    client: reqwest::Client,
    source_url: String,
    interval: Duration,
    slot: Arc<LatestValue<ReceivedValue>>,
}

impl RelayPoller {
    /// Create a poller writing into `slot`.
    ///
    /// A zero `interval` is raised to [`MIN_POLL_INTERVAL`].
    pub fn new(
        source_url: impl Into<String>,
        interval: Duration,
        timeout: Duration,
        slot: Arc<LatestValue<ReceivedValue>>,
    ) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;
        Ok(Self {
            client,
            source_url: source_url.into(),
            interval: interval.max(MIN_POLL_INTERVAL),
            slot,
        })
    }

    /// The holder this poller writes into.
    pub fn slot(&self) -> Arc<LatestValue<ReceivedValue>> {
        Arc::clone(&self.slot)
    }

    /// The source query URL.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// The configured poll interval.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch once and, on success, replace the held value.
    pub async fn poll_once(&self) -> Result<ReceivedValue, RelayError> {
        let response = self
            .client
            .get(&self.source_url)
            .send()
            .await
            .map_err(|e| RelayError::Request {
                url: self.source_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                url: self.source_url.clone(),
                status,
            });
        }

        let message: RelayMessage = response.json().await.map_err(|e| RelayError::Decode {
            url: self.source_url.clone(),
            message: e.to_string(),
        })?;

        let value = ReceivedValue::polled(message);
        self.slot.replace(value.clone());
        Ok(value)
    }

    /// Poll until `cancel` fires. The first poll runs immediately.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(
            url = %self.source_url,
            interval_ms = self.interval.as_millis(),
            "Relay polling started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(value) => debug!(data = %value.data, "Relay poll succeeded"),
                        Err(e) => warn!(error = %e, "Relay poll failed, keeping previous value"),
                    }
                }
            }
        }

        info!("Relay polling stopped");
    }
}
