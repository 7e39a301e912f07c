//! Axum router construction.
//!
//! Mounts the routes for the state's role (and receive mode) into a
//! single [`Router`] with permissive CORS and HTTP tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use smartfarm_core::{ReceiveMode, Role};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::relay;
use crate::state::AppState;

/// Build the complete router for `state.role`.
///
/// - farm: `GET /`, `GET /api/data`, `POST /api/external_data`,
///   `POST /api/sensor_data`, `POST /toggle_auto_water`
/// - relay source: `GET /`, `GET /api/data`, `POST /update`
/// - relay receiver: `GET /`, `GET /api/current`, plus `POST /webhook`
///   in push mode or `GET /start-polling` in poll mode
/// - sensor: no routes
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = match state.role {
        Role::Farm => Router::new()
            .route("/", get(handlers::dashboard))
            .route("/api/data", get(handlers::get_data))
            .route("/api/external_data", post(handlers::ingest))
            .route("/api/sensor_data", post(handlers::ingest))
            .route("/toggle_auto_water", post(handlers::toggle_auto_water)),
        Role::RelaySource => Router::new()
            .route("/", get(relay::source_page))
            .route("/api/data", get(relay::source_data))
            .route("/update", post(relay::update)),
        Role::RelayReceiver => {
            let base = Router::new()
                .route("/", get(relay::receiver_page))
                .route("/api/current", get(relay::current));
            match state.mode {
                ReceiveMode::Push => base.route("/webhook", post(relay::webhook)),
                ReceiveMode::Poll => base.route("/start-polling", get(relay::start_polling)),
            }
        }
        Role::Sensor => Router::new(),
    };

    routes
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
