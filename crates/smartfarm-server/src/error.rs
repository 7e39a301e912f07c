//! Error types for the SmartFarm HTTP layer.
//!
//! [`FarmError`] covers failures surfaced to an inbound caller and converts
//! into an Axum response carrying `{"status": "error", "message": ...}`.
//! [`RelayError`] covers outbound relay calls; those are logged by the
//! caller and never reach an HTTP client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned to inbound HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum FarmError {
    /// The request body was not the expected shape.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The endpoint exists but is not available in this configuration.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for FarmError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MalformedInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = serde_json::json!({
            "status": "error",
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Errors from outbound relay calls (notify, poll, sensor send).
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The HTTP client could not be constructed.
    #[error("client setup failed: {0}")]
    Client(String),

    /// The request failed to complete (connect, timeout, I/O).
    #[error("request to {url} failed: {message}")]
    Request {
        /// Target URL.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// The peer answered with a non-success status.
    #[error("{url} returned {status}")]
    Status {
        /// Target URL.
        url: String,
        /// The returned status code.
        status: StatusCode,
    },

    /// The peer's response body could not be decoded.
    #[error("could not decode response from {url}: {message}")]
    Decode {
        /// Target URL.
        url: String,
        /// Description of the decode failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_maps_to_bad_request() {
        let response = FarmError::MalformedInput("expected a JSON object".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn error_body_carries_status_and_message() {
        for (err, expected) in [
            (FarmError::MalformedInput("bad body".to_owned()), StatusCode::BAD_REQUEST),
            (FarmError::Unavailable("no poller".to_owned()), StatusCode::SERVICE_UNAVAILABLE),
        ] {
            let message = match &err {
                FarmError::MalformedInput(m) | FarmError::Unavailable(m) => m.clone(),
            };
            let response = err.into_response();
            assert_eq!(response.status(), expected);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap_or_default();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
            assert_eq!(body["status"], "error");
            assert_eq!(body["message"], message.as_str());
        }
    }

    #[test]
    fn unavailable_maps_to_service_unavailable() {
        let response = FarmError::Unavailable("no poller".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn relay_error_messages_name_the_url() {
        let err = RelayError::Status {
            url: "http://localhost:3003/webhook".to_owned(),
            status: StatusCode::BAD_GATEWAY,
        };
        assert!(err.to_string().contains("localhost:3003"));
    }
}
