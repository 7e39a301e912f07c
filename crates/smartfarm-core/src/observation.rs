//! The latest-observation store.
//!
//! [`ObservationStore`] holds one [`Observation`] behind a single mutex.
//! Writers merge partial mappings with [`ObservationStore::update`];
//! readers take a deep copy with [`ObservationStore::read`]. Both hold the
//! lock only for the copy/merge, so nothing outside this module ever sees
//! the raw mapping or a half-applied merge.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// Writer tag used by the background simulator.
pub const SIMULATION_SOURCE: &str = "simulation";

/// Bookkeeping keys that partial updates may not overwrite as metrics.
pub const RESERVED_KEYS: [&str; 2] = ["last_updated", "source"];

/// A snapshot of every known metric plus bookkeeping.
///
/// Serializes as one flat JSON object: the metrics side by side with
/// `last_updated` and `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Metric name to latest value. Open schema: any JSON value is accepted.
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
    /// Time of the most recent mutation.
    pub last_updated: DateTime<Utc>,
    /// Tag of the writer that applied the most recent mutation.
    pub source: String,
}

impl Observation {
    /// The fixed snapshot a farm node starts with.
    pub fn farm_defaults() -> Self {
        let mut metrics = Map::new();
        metrics.insert("temperature".to_owned(), Value::from(25.0));
        metrics.insert("humidity".to_owned(), Value::from(60.0));
        metrics.insert("soil_moisture".to_owned(), Value::from(45.0));
        metrics.insert("light_intensity".to_owned(), Value::from(500));
        metrics.insert("water_pump".to_owned(), Value::Bool(false));
        metrics.insert("led_lights".to_owned(), Value::Bool(false));
        metrics.insert("alerts".to_owned(), Value::Array(Vec::new()));

        Self {
            metrics,
            last_updated: Utc::now(),
            source: SIMULATION_SOURCE.to_owned(),
        }
    }

    /// Look up a single metric.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metrics.get(key)
    }

    /// Look up a numeric metric as `f64`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(Value::as_f64)
    }

    /// Look up a boolean metric.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.metrics.get(key).and_then(Value::as_bool)
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self::farm_defaults()
    }
}

/// Thread-safe holder of the latest [`Observation`].
///
/// Share it behind an [`Arc`](std::sync::Arc); every method takes `&self`.
#[derive(Debug)]
pub struct ObservationStore {
    inner: Mutex<Observation>,
}

impl ObservationStore {
    /// Create a store seeded with `initial`.
    pub const fn new(initial: Observation) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Create a store seeded with [`Observation::farm_defaults`].
    pub fn with_farm_defaults() -> Self {
        Self::new(Observation::farm_defaults())
    }

    /// Merge `partial` into the current state as one atomic unit.
    ///
    /// Only the supplied keys are overwritten; unknown keys are added.
    /// `last_updated` is set to now and `source` to the writer tag. The
    /// reserved bookkeeping keys are never merged as metrics. Returns a
    /// copy of the post-merge snapshot.
    pub fn update(&self, partial: Map<String, Value>, source: &str) -> Observation {
        info!(source, delta = ?partial, "observation updated");

        let mut guard = self.inner.lock();
        for (key, value) in partial {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            guard.metrics.insert(key, value);
        }
        guard.last_updated = Utc::now();
        source.clone_into(&mut guard.source);
        guard.clone()
    }

    /// Take a deep copy of the current snapshot.
    pub fn read(&self) -> Observation {
        self.inner.lock().clone()
    }

    /// Time of the most recent mutation.
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.inner.lock().last_updated
    }
}

impl Default for ObservationStore {
    fn default() -> Self {
        Self::with_farm_defaults()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn partial(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn defaults_are_complete() {
        let obs = Observation::farm_defaults();
        assert_eq!(obs.get_f64("temperature"), Some(25.0));
        assert_eq!(obs.get_f64("humidity"), Some(60.0));
        assert_eq!(obs.get_f64("soil_moisture"), Some(45.0));
        assert_eq!(obs.get("light_intensity"), Some(&json!(500)));
        assert_eq!(obs.get_bool("water_pump"), Some(false));
        assert_eq!(obs.get_bool("led_lights"), Some(false));
        assert_eq!(obs.get("alerts"), Some(&json!([])));
        assert_eq!(obs.source, SIMULATION_SOURCE);
    }

    #[test]
    fn update_overwrites_only_supplied_keys() {
        let store = ObservationStore::with_farm_defaults();
        let before = store.read();

        store.update(partial(json!({"temperature": 31.5, "ph": 6.8})), "external");
        let after = store.read();

        assert_eq!(after.get("temperature"), Some(&json!(31.5)));
        assert_eq!(after.get("ph"), Some(&json!(6.8)));
        for (key, value) in &before.metrics {
            if key != "temperature" {
                assert_eq!(after.get(key), Some(value), "key {key} changed");
            }
        }
        assert_eq!(after.source, "external");
        assert!(after.last_updated >= before.last_updated);
    }

    #[test]
    fn reserved_keys_are_not_merged_as_metrics() {
        let store = ObservationStore::with_farm_defaults();
        store.update(
            partial(json!({"source": "spoofed", "last_updated": "yesterday", "humidity": 70})),
            "greenhouse-2",
        );

        let obs = store.read();
        assert_eq!(obs.source, "greenhouse-2");
        assert!(obs.get("source").is_none());
        assert!(obs.get("last_updated").is_none());
        assert_eq!(obs.get("humidity"), Some(&json!(70)));
    }

    #[test]
    fn read_returns_detached_copy() {
        let store = ObservationStore::with_farm_defaults();
        let mut copy = store.read();
        copy.metrics.insert("temperature".to_owned(), json!(-40));

        assert_eq!(store.read().get_f64("temperature"), Some(25.0));

        store.update(partial(json!({"humidity": 41})), "external");
        assert_eq!(copy.get_f64("humidity"), Some(60.0));
    }

    #[test]
    fn update_returns_post_merge_snapshot() {
        let store = ObservationStore::with_farm_defaults();
        let returned = store.update(partial(json!({"led_lights": true})), "external");
        assert_eq!(returned, store.read());
    }

    #[test]
    fn serializes_flat() {
        let obs = Observation::farm_defaults();
        let json = serde_json::to_value(&obs).unwrap_or_default();
        assert_eq!(json["temperature"], json!(25.0));
        assert_eq!(json["source"], json!("simulation"));
        assert!(json["last_updated"].is_string());

        let back: Observation = serde_json::from_value(json).unwrap_or_default();
        assert_eq!(back.get_f64("soil_moisture"), Some(45.0));
        assert!(back.get("source").is_none());
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = Arc::new(ObservationStore::with_farm_defaults());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for round in 0..100 {
                        let mut delta = Map::new();
                        delta.insert(format!("writer_{i}"), json!(round));
                        store.update(delta, "external");
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        let obs = store.read();
        for i in 0..8 {
            assert_eq!(obs.get(&format!("writer_{i}")), Some(&json!(99)));
        }
    }

    #[test]
    fn two_writers_both_land() {
        let store = Arc::new(ObservationStore::with_farm_defaults());
        let a = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.update(partial(json!({"a": 1})), "external"))
        };
        let b = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.update(partial(json!({"b": 2})), "external"))
        };
        assert!(a.join().is_ok());
        assert!(b.join().is_ok());

        let obs = store.read();
        assert_eq!(obs.get("a"), Some(&json!(1)));
        assert_eq!(obs.get("b"), Some(&json!(2)));
    }
}
