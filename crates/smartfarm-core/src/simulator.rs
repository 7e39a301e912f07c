//! Background random-walk sensor simulator.
//!
//! Each tick of [`SimulatedProducer`] reads the store, nudges every sensor
//! reading by a bounded random step, clamps it back into its physical
//! range, derives the actuator flags and alert list from fixed thresholds,
//! and writes the whole derived state back in one update.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::{Map, Value};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::observation::{Observation, ObservationStore, SIMULATION_SOURCE};

/// Allowed temperature range in degrees Celsius.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 20.0..=35.0;
/// Allowed relative humidity range in percent.
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 40.0..=90.0;
/// Allowed soil moisture range in percent.
pub const SOIL_MOISTURE_RANGE: RangeInclusive<f64> = 30.0..=80.0;
/// Allowed light intensity range in lux.
pub const LIGHT_INTENSITY_RANGE: RangeInclusive<i64> = 0..=1000;

/// Maximum temperature step per tick.
pub const TEMPERATURE_STEP: f64 = 1.0;
/// Maximum humidity step per tick.
pub const HUMIDITY_STEP: f64 = 2.0;
/// Maximum soil moisture step per tick.
pub const SOIL_MOISTURE_STEP: f64 = 1.0;
/// Maximum light intensity step per tick.
pub const LIGHT_INTENSITY_STEP: i64 = 50;

/// Soil moisture strictly below this turns the pump on.
pub const SOIL_DRY_THRESHOLD: f64 = 35.0;
/// Light intensity strictly below this turns the grow lights on.
pub const LOW_LIGHT_THRESHOLD: i64 = 200;
/// Temperature strictly above this raises an alert.
pub const HIGH_TEMPERATURE_THRESHOLD: f64 = 30.0;

/// Alert raised when the temperature is above the threshold.
pub const ALERT_TEMPERATURE_HIGH: &str = "temperature high";
/// Alert raised when the soil is dry.
pub const ALERT_SOIL_DRY: &str = "soil dry";

/// Default interval between simulation ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Typed view of the farm metrics the simulator drives.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmReadings {
    /// Air temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Soil moisture in percent.
    pub soil_moisture: f64,
    /// Light intensity in lux.
    pub light_intensity: i64,
    /// Whether the water pump should run.
    pub water_pump: bool,
    /// Whether the grow lights should be on.
    pub led_lights: bool,
    /// Active alert messages.
    pub alerts: Vec<String>,
}

impl Default for FarmReadings {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 60.0,
            soil_moisture: 45.0,
            light_intensity: 500,
            water_pump: false,
            led_lights: false,
            alerts: Vec::new(),
        }
    }
}

impl FarmReadings {
    /// Extract readings from a snapshot.
    ///
    /// A metric that is missing or has the wrong JSON type counts as
    /// unavailable and falls back to its default value.
    pub fn from_observation(obs: &Observation) -> Self {
        let defaults = Self::default();
        Self {
            temperature: obs.get_f64("temperature").unwrap_or(defaults.temperature),
            humidity: obs.get_f64("humidity").unwrap_or(defaults.humidity),
            soil_moisture: obs
                .get_f64("soil_moisture")
                .unwrap_or(defaults.soil_moisture),
            light_intensity: obs
                .get("light_intensity")
                .and_then(json_to_i64)
                .unwrap_or(defaults.light_intensity),
            water_pump: obs.get_bool("water_pump").unwrap_or(defaults.water_pump),
            led_lights: obs.get_bool("led_lights").unwrap_or(defaults.led_lights),
            alerts: defaults.alerts,
        }
    }

    /// Apply one random-walk step, clamp, then re-derive controls.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.temperature += rng.random_range(-TEMPERATURE_STEP..=TEMPERATURE_STEP);
        self.humidity += rng.random_range(-HUMIDITY_STEP..=HUMIDITY_STEP);
        self.soil_moisture += rng.random_range(-SOIL_MOISTURE_STEP..=SOIL_MOISTURE_STEP);
        self.light_intensity = self
            .light_intensity
            .saturating_add(rng.random_range(-LIGHT_INTENSITY_STEP..=LIGHT_INTENSITY_STEP));

        self.clamp();
        self.derive_controls();
    }

    /// Force every reading back into its allowed range.
    pub fn clamp(&mut self) {
        self.temperature = clamp_f64(self.temperature, &TEMPERATURE_RANGE);
        self.humidity = clamp_f64(self.humidity, &HUMIDITY_RANGE);
        self.soil_moisture = clamp_f64(self.soil_moisture, &SOIL_MOISTURE_RANGE);
        self.light_intensity = self
            .light_intensity
            .clamp(*LIGHT_INTENSITY_RANGE.start(), *LIGHT_INTENSITY_RANGE.end());
    }

    /// Derive the actuator flags and the alert list from the readings.
    ///
    /// The alert list is rebuilt from scratch, never accumulated.
    pub fn derive_controls(&mut self) {
        self.water_pump = self.soil_moisture < SOIL_DRY_THRESHOLD;
        self.led_lights = self.light_intensity < LOW_LIGHT_THRESHOLD;

        self.alerts.clear();
        if self.temperature > HIGH_TEMPERATURE_THRESHOLD {
            self.alerts.push(ALERT_TEMPERATURE_HIGH.to_owned());
        }
        if self.soil_moisture < SOIL_DRY_THRESHOLD {
            self.alerts.push(ALERT_SOIL_DRY.to_owned());
        }
    }

    /// Convert into a partial mapping suitable for [`ObservationStore::update`].
    pub fn into_partial(self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("temperature".to_owned(), Value::from(self.temperature));
        map.insert("humidity".to_owned(), Value::from(self.humidity));
        map.insert("soil_moisture".to_owned(), Value::from(self.soil_moisture));
        map.insert("light_intensity".to_owned(), Value::from(self.light_intensity));
        map.insert("water_pump".to_owned(), Value::Bool(self.water_pump));
        map.insert("led_lights".to_owned(), Value::Bool(self.led_lights));
        map.insert(
            "alerts".to_owned(),
            Value::Array(self.alerts.into_iter().map(Value::String).collect()),
        );
        map
    }
}

fn clamp_f64(value: f64, range: &RangeInclusive<f64>) -> f64 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

#[allow(clippy::cast_possible_truncation)]
fn json_to_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64)
    })
}

/// Shortest tick period a producer will run with.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic producer that random-walks the store.
#[derive(Debug, Clone)]
pub struct SimulatedProducer {
    store: Arc<ObservationStore>,
    interval: Duration,
}

impl SimulatedProducer {
    /// Create a producer ticking every `interval`.
    ///
    /// A zero interval is raised to [`MIN_TICK_INTERVAL`].
    pub const fn new(store: Arc<ObservationStore>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            MIN_TICK_INTERVAL
        } else {
            interval
        };
        Self { store, interval }
    }

    /// The configured tick interval.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one tick using the thread-local RNG.
    pub fn tick(&self) -> Observation {
        let mut rng = rand::rng();
        self.tick_with(&mut rng)
    }

    /// Run one tick with the supplied RNG and return the written snapshot.
    pub fn tick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Observation {
        let mut readings = FarmReadings::from_observation(&self.store.read());
        readings.step(rng);
        self.store.update(readings.into_partial(), SIMULATION_SOURCE)
    }

    /// Tick until `cancel` fires. The first tick runs immediately.
    ///
    /// Returns the number of ticks applied.
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        info!(
            interval_ms = self.interval.as_millis(),
            "Simulation producer started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let obs = self.tick();
                    ticks = ticks.saturating_add(1);
                    debug!(
                        tick = ticks,
                        temperature = obs.get_f64("temperature"),
                        soil_moisture = obs.get_f64("soil_moisture"),
                        "Simulation tick applied"
                    );
                }
            }
        }

        info!(ticks, "Simulation producer stopped");
        ticks
    }
}
