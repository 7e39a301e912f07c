//! HTTP surface for the SmartFarm demo.
//!
//! This crate provides an Axum HTTP server whose routes depend on the
//! node role:
//!
//! - **farm** -- dashboard (`GET /`), snapshot query (`GET /api/data`) and
//!   ingest (`POST /api/external_data`, alias `POST /api/sensor_data`)
//!   over a shared [`ObservationStore`]
//! - **relay source** -- holds one [`RelayMessage`], replaces it on
//!   `POST /update` and notifies a receiver through [`RelayForwarder`]
//! - **relay receiver** -- holds the latest [`ReceivedValue`], fed either
//!   by `POST /webhook` pushes or by a [`RelayPoller`]
//!
//! # Architecture
//!
//! Handlers never touch a lock directly: the store and relay holders hand
//! out copies, so outbound calls and response encoding run lock-free.
//! Outbound relay calls are best-effort; failures are logged only.
//!
//! [`ObservationStore`]: smartfarm_core::ObservationStore
//! [`RelayMessage`]: smartfarm_core::RelayMessage
//! [`ReceivedValue`]: smartfarm_core::ReceivedValue

pub mod error;
pub mod forwarder;
pub mod handlers;
pub mod pages;
pub mod poller;
pub mod relay;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::{FarmError, RelayError};
pub use forwarder::RelayForwarder;
pub use poller::RelayPoller;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, bind, serve, spawn_server, start_server};
pub use state::AppState;
