//! Stand-in for the remote sensor host.
//!
//! [`SensorClient`] generates a random reading batch and POSTs it to a farm
//! server's ingest endpoint on a fixed interval, tagging each batch with
//! the `X-Farm-Source` header.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use serde_json::{Map, Value, json};
use smartfarm_core::config::SensorSection;
use smartfarm_server::RelayError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Header naming the writer of an ingest batch.
pub const SOURCE_HEADER: &str = "X-Farm-Source";

/// Ingest path on the farm server.
const INGEST_PATH: &str = "/api/external_data";

/// Periodically posts random readings to a farm server.
#[derive(Debug)]
pub struct SensorClient {
    client: reqwest::Client,
    ingest_url: String,
    source_tag: String,
    interval: Duration,
    max_sends: Option<u32>,
}

impl SensorClient {
    /// Build a client from the `sensor` config section.
    pub fn from_config(section: &SensorSection) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(section.request_timeout())
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;
        Ok(Self {
            client,
            ingest_url: format!("{}{INGEST_PATH}", section.server_url.trim_end_matches('/')),
            source_tag: section.source_tag.clone(),
            interval: section.send_interval(),
            max_sends: section.max_sends,
        })
    }

    /// The full ingest URL batches are posted to.
    pub fn ingest_url(&self) -> &str {
        &self.ingest_url
    }

    /// Generate one reading batch.
    pub fn read_sensors<R: Rng + ?Sized>(rng: &mut R) -> Map<String, Value> {
        let mut batch = Map::new();
        batch.insert("temperature".to_owned(), json!(tenths(rng.random_range(20.0..=30.0))));
        batch.insert("humidity".to_owned(), json!(tenths(rng.random_range(50.0..=80.0))));
        batch.insert("soil_moisture".to_owned(), json!(tenths(rng.random_range(30.0..=70.0))));
        batch.insert("light_intensity".to_owned(), json!(rng.random_range(200_u32..=900)));
        batch
    }

    /// Post `batch` once and return the server's status.
    pub async fn send(&self, batch: &Map<String, Value>) -> Result<StatusCode, RelayError> {
        let response = self
            .client
            .post(&self.ingest_url)
            .header(SOURCE_HEADER, &self.source_tag)
            .json(batch)
            .send()
            .await
            .map_err(|e| RelayError::Request {
                url: self.ingest_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                url: self.ingest_url.clone(),
                status,
            });
        }
        Ok(status)
    }

    /// Generate a fresh batch and post it.
    pub async fn send_once(&self) -> Result<StatusCode, RelayError> {
        let batch = Self::read_sensors(&mut rand::rng());
        self.send(&batch).await
    }

    /// Send until `cancel` fires or `max_sends` batches went out.
    ///
    /// Failed sends are logged and count toward the limit. Returns the
    /// number of batches attempted.
    pub async fn run(&self, cancel: CancellationToken) -> u32 {
        info!(
            url = %self.ingest_url,
            source = %self.source_tag,
            interval_ms = self.interval.as_millis(),
            max_sends = ?self.max_sends,
            "Sensor client started"
        );

        let mut sent: u32 = 0;
        loop {
            if self.max_sends.is_some_and(|max| sent >= max) {
                break;
            }

            match self.send_once().await {
                Ok(status) => info!(status = status.as_u16(), "Sensor batch sent"),
                Err(e) => warn!(error = %e, "Sensor batch failed"),
            }
            sent = sent.saturating_add(1);

            if self.max_sends.is_some_and(|max| sent >= max) {
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(sent, "Sensor client stopped");
        sent
    }
}

/// Round to one decimal place.
fn tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
