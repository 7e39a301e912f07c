//! Farm role endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | HTML dashboard polling `/api/data` |
//! | `GET` | `/api/data` | Full observation snapshot |
//! | `POST` | `/api/external_data` | Merge a remote observation batch |
//! | `POST` | `/api/sensor_data` | Same as `/api/external_data` |
//! | `POST` | `/toggle_auto_water` | Switch the auto-watering flag |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse};
use serde_json::{Map, Value};
use smartfarm_core::Observation;
use tracing::warn;

use crate::error::FarmError;
use crate::pages;
use crate::state::AppState;

/// Metric holding the auto-watering switch.
pub const AUTO_WATER_KEY: &str = "auto_water_enabled";

/// Header an ingest caller may use to identify itself.
pub const SOURCE_HEADER: &str = "x-farm-source";

// ---------------------------------------------------------------------------
// GET / -- dashboard
// ---------------------------------------------------------------------------

/// Serve the dashboard page.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(pages::farm_dashboard(state.refresh_interval_ms))
}

// ---------------------------------------------------------------------------
// GET /api/data -- query
// ---------------------------------------------------------------------------

/// Return the full current snapshot as a flat JSON object.
pub async fn get_data(State(state): State<Arc<AppState>>) -> Json<Observation> {
    Json(state.store.read())
}

// ---------------------------------------------------------------------------
// POST /api/external_data -- ingest
// ---------------------------------------------------------------------------

/// Merge a partial observation posted by a remote producer.
///
/// The body must be a JSON object; anything else is rejected with 400
/// and leaves the store untouched.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, FarmError> {
    let partial = parse_partial(&body).inspect_err(|e| warn!(error = %e, "Rejected ingest body"))?;
    let source = caller_source(&headers, &partial, &state.ingest_source);

    state.store.update(partial, &source);

    Ok(Json(serde_json::json!({ "status": "success" })))
}

// ---------------------------------------------------------------------------
// POST /toggle_auto_water
// ---------------------------------------------------------------------------

/// Set the auto-watering switch from `{"enabled": ...}`.
///
/// `true` or the string `"true"` (any case) enables it; any other present
/// value disables it. A missing or null `enabled` is rejected with 400.
/// The derived `water_pump` flag is unaffected.
pub async fn toggle_auto_water(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, FarmError> {
    let request = parse_partial(&body)?;
    let enabled = request
        .get("enabled")
        .filter(|v| !v.is_null())
        .map(enabled_flag)
        .ok_or_else(|| FarmError::MalformedInput("missing 'enabled' parameter".to_owned()))?;
    let source = caller_source(&headers, &request, &state.ingest_source);

    let mut partial = Map::new();
    partial.insert(AUTO_WATER_KEY.to_owned(), Value::Bool(enabled));
    state.store.update(partial, &source);

    Ok(Json(serde_json::json!({
        "status": "success",
        "auto_water_enabled": enabled,
    })))
}

fn enabled_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Decode an ingest body into a partial mapping.
pub fn parse_partial(body: &[u8]) -> Result<Map<String, Value>, FarmError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| FarmError::MalformedInput(format!("invalid JSON: {e}")))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(FarmError::MalformedInput(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Resolve the writer tag for an ingest call.
///
/// Precedence: the [`SOURCE_HEADER`] header, then a string `source` field
/// in the body, then `fallback`.
pub fn caller_source(headers: &HeaderMap, partial: &Map<String, Value>, fallback: &str) -> String {
    headers
        .get(SOURCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            partial
                .get("source")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(fallback)
        .to_owned()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
