//! Values exchanged by the relay demo.
//!
//! The relay source holds one [`RelayMessage`] and forwards it to a
//! receiver, which keeps the latest copy as a [`ReceivedValue`] stamped
//! with its own local receipt time. Both sides keep their value in a
//! [`LatestValue`] holder.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};

/// Data carried by the source before the first update.
pub const INITIAL_SOURCE_DATA: &str = "initial value";
/// Receiver placeholder in push mode before the first webhook arrives.
pub const PUSH_PLACEHOLDER: &str = "no data yet";
/// Receiver placeholder in poll mode before the first successful poll.
pub const POLL_PLACEHOLDER: &str = "waiting for first poll";

/// Opaque payload forwarded from the relay source to the receiver.
///
/// `data` must be present. A missing, null or non-numeric `timestamp`
/// reads as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    /// The forwarded value.
    pub data: String,
    /// Source-side update time in fractional seconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: f64,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(serde_json::Value::as_f64).unwrap_or(0.0))
}

impl RelayMessage {
    /// Build a message carrying `data`, stamped with the current time.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            timestamp: unix_seconds(Utc::now()),
        }
    }
}

impl Default for RelayMessage {
    fn default() -> Self {
        Self::new(INITIAL_SOURCE_DATA)
    }
}

/// The value a receiver currently displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedValue {
    /// The last forwarded value.
    pub data: String,
    /// The source-side timestamp carried by the message.
    pub timestamp: f64,
    /// Local time the last webhook push was received.
    pub last_updated: Option<DateTime<Utc>>,
    /// Local time of the last successful poll.
    pub last_checked: Option<DateTime<Utc>>,
}

impl ReceivedValue {
    /// A placeholder value shown before anything was received.
    pub fn waiting(placeholder: impl Into<String>) -> Self {
        Self {
            data: placeholder.into(),
            timestamp: 0.0,
            last_updated: None,
            last_checked: None,
        }
    }

    /// Value produced by a webhook push, stamped with the receipt time.
    pub fn pushed(message: RelayMessage) -> Self {
        Self {
            data: message.data,
            timestamp: message.timestamp,
            last_updated: Some(Utc::now()),
            last_checked: None,
        }
    }

    /// Value produced by a successful poll, stamped with the check time.
    pub fn polled(message: RelayMessage) -> Self {
        Self {
            data: message.data,
            timestamp: message.timestamp,
            last_updated: None,
            last_checked: Some(Utc::now()),
        }
    }

    /// Local time this value was received, by either path.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated.or(self.last_checked)
    }
}

/// Mutex-guarded holder for the latest value of `T`.
///
/// Reads return clones; nothing outside holds the lock after a call.
#[derive(Debug, Default)]
pub struct LatestValue<T> {
    inner: Mutex<T>,
}

impl<T: Clone> LatestValue<T> {
    /// Create a holder seeded with `initial`.
    pub const fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Copy out the current value.
    pub fn get(&self) -> T {
        self.inner.lock().clone()
    }

    /// Replace the current value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.inner.lock(), value)
    }
}

#[allow(clippy::cast_precision_loss)]
fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}
