//! Core state and background producers for the SmartFarm demo.
//!
//! This crate owns everything that is independent of the HTTP surface:
//!
//! - [`observation`] -- the shared, lock-guarded [`ObservationStore`]
//!   holding the latest sensor snapshot
//! - [`simulator`] -- the [`SimulatedProducer`] tick loop that perturbs the
//!   store with bounded random values and derives actuator flags
//! - [`relay`] -- value types and holders for the two-process relay demo
//! - [`config`] -- YAML + environment configuration for every node role
//!
//! The `smartfarm-server` crate serves these over HTTP and the
//! `smartfarm-node` binary wires them together per role.

pub mod config;
pub mod observation;
pub mod relay;
pub mod simulator;

pub use config::{ConfigError, FarmConfig, ReceiveMode, Role};
pub use observation::{Observation, ObservationStore};
pub use relay::{LatestValue, ReceivedValue, RelayMessage};
pub use simulator::{FarmReadings, SimulatedProducer};
