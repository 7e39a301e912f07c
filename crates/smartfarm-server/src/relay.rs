//! Relay role endpoint handlers.
//!
//! # Endpoints
//!
//! | Role | Method | Path | Description |
//! |------|--------|------|-------------|
//! | source | `GET` | `/` | Current value and update form |
//! | source | `GET` | `/api/data` | Current [`RelayMessage`] |
//! | source | `POST` | `/update` | Replace the value and notify the receiver |
//! | receiver | `GET` | `/` | Held value page |
//! | receiver | `GET` | `/api/current` | Held [`ReceivedValue`] |
//! | receiver (push) | `POST` | `/webhook` | Accept a pushed [`RelayMessage`] |
//! | receiver (poll) | `GET` | `/start-polling` | Start the poll loop |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Form, FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse};
use smartfarm_core::{ReceivedValue, RelayMessage};
use tracing::{info, warn};

use crate::error::FarmError;
use crate::pages;
use crate::state::AppState;

/// Body of `POST /update`, sent as a form or as JSON.
#[derive(Debug, serde::Deserialize)]
pub struct UpdateRequest {
    /// The new value to hold and forward.
    pub new_value: Option<String>,
}

// ---------------------------------------------------------------------------
// Relay source
// ---------------------------------------------------------------------------

/// Serve the relay source page.
pub async fn source_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(pages::relay_source_page(&state.outbox.get()))
}

/// Return the source's current message.
pub async fn source_data(State(state): State<Arc<AppState>>) -> Json<RelayMessage> {
    Json(state.outbox.get())
}

/// Replace the source's value and fire a best-effort notification.
///
/// Accepts `new_value` from a urlencoded form or a JSON body. The caller
/// gets its answer as soon as the local value is replaced; delivery to
/// the receiver happens in the background.
pub async fn update(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<impl IntoResponse, FarmError> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let body = if is_json {
        Json::<UpdateRequest>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .map_err(|e| FarmError::MalformedInput(e.body_text()))?
    } else {
        Form::<UpdateRequest>::from_request(request, &())
            .await
            .map(|Form(body)| body)
            .map_err(|e| FarmError::MalformedInput(e.body_text()))?
    };

    let new_value = body
        .new_value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| FarmError::MalformedInput("new_value is required".to_owned()))?;

    let message = RelayMessage::new(new_value);
    state.outbox.replace(message.clone());
    info!(data = %message.data, "Relay source value updated");

    if let Some(forwarder) = &state.forwarder {
        forwarder.notify(message.clone());
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": message,
    })))
}

// ---------------------------------------------------------------------------
// Relay receiver
// ---------------------------------------------------------------------------

/// Serve the receiver page.
pub async fn receiver_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(pages::relay_receiver_page(&state.inbox.get(), state.mode))
}

/// Return the receiver's held value.
pub async fn current(State(state): State<Arc<AppState>>) -> Json<ReceivedValue> {
    Json(state.inbox.get())
}

/// Accept a pushed message and stamp the local receipt time.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, FarmError> {
    let message: RelayMessage = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejected webhook body");
        FarmError::MalformedInput(format!("invalid relay message: {e}"))
    })?;

    info!(data = %message.data, "Webhook value received");
    state.inbox.replace(ReceivedValue::pushed(message));

    Ok(Json(serde_json::json!({ "status": "success" })))
}

/// Start the background poll loop if it is not already running.
pub async fn start_polling(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, FarmError> {
    let started = state
        .start_polling()
        .ok_or_else(|| FarmError::Unavailable("polling is not configured".to_owned()))?;

    let message = if started {
        "polling started"
    } else {
        "polling already running"
    };

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": message,
    })))
}
