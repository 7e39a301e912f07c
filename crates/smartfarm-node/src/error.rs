//! Error types for the SmartFarm node binary.
//!
//! [`NodeError`] is the top-level error that wraps every failure mode
//! during startup and while the selected role runs.

use smartfarm_core::ConfigError;
use smartfarm_server::{RelayError, ServerError};

/// Top-level error for the node binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: ServerError,
    },

    /// An outbound relay or sensor client could not be set up.
    #[error("relay error: {source}")]
    Relay {
        /// The underlying relay error.
        #[from]
        source: RelayError,
    },

    /// Logging could not be initialized.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
