//! HTTP server lifecycle management.
//!
//! [`start_server`] binds the configured address and serves until the
//! supplied [`CancellationToken`] is cancelled, then drains in-flight
//! requests and returns. [`spawn_server`] does the same on a background
//! task for an already-bound listener.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::router::build_router;
use crate::state::AppState;

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 5000,
        }
    }
}

/// Bind the configured address.
///
/// The host may be an IP address or a name such as `localhost`.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the host does not resolve or the
/// address is already in use.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {}:{}: {e}", config.host, config.port)))
}

/// Serve `state` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let role = state.role;
    let router = build_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, %role, "Server listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!(%role, "Server stopped");
    Ok(())
}

/// Bind the configured address and serve until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, state, shutdown).await
}

/// Serve on a background task; errors are logged.
pub fn spawn_server(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(listener, state, shutdown).await {
            error!(error = %e, "Server exited with error");
        }
    })
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
