//! SmartFarm node binary.
//!
//! One executable plays any role of the demo. It loads configuration,
//! initializes logging, and runs the selected role until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `FARM_CONFIG` (default `smartfarm.yaml`)
//!    and apply `FARM_*` environment overrides
//! 2. Initialize structured logging (tracing)
//! 3. Install the Ctrl-C handler on the root cancellation token
//! 4. Dispatch on the role:
//!    - farm: spawn the simulator (if enabled) and serve the dashboard
//!    - relay-source: serve the update form and notify the receiver
//!    - relay-receiver: serve the held value, fed by webhook or polling
//!    - sensor: post random reading batches to a farm server
//! 5. Join background tasks and exit

mod error;
mod sensor;

use std::path::PathBuf;
use std::sync::Arc;

use smartfarm_core::config::LoggingSection;
use smartfarm_core::relay::POLL_PLACEHOLDER;
use smartfarm_core::{
    FarmConfig, LatestValue, ObservationStore, ReceiveMode, ReceivedValue, Role,
    SimulatedProducer,
};
use smartfarm_server::{AppState, RelayForwarder, RelayPoller, ServerConfig, start_server};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::NodeError;
use crate::sensor::SensorClient;

/// Environment variable naming the config file.
const CONFIG_PATH_VAR: &str = "FARM_CONFIG";

/// Config file used when `FARM_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "smartfarm.yaml";

/// Application entry point for a SmartFarm node.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the selected role fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        role = %config.role,
        mode = %config.relay.mode,
        port = config.listen_port(),
        "smartfarm node starting"
    );

    // 3. Cancel the root token on Ctrl-C.
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    // 4. Run the role.
    match config.role {
        Role::Farm => run_farm(&config, shutdown).await?,
        Role::RelaySource => run_relay_source(&config, shutdown).await?,
        Role::RelayReceiver => run_relay_receiver(&config, shutdown).await?,
        Role::Sensor => run_sensor(&config, shutdown).await?,
    }

    info!(role = %config.role, "smartfarm node shutdown complete");
    Ok(())
}

/// Load configuration from `FARM_CONFIG` or `smartfarm.yaml`.
///
/// A missing file means defaults; environment overrides apply either way.
/// Returns the path that was read, if any.
fn load_config() -> Result<(FarmConfig, Option<PathBuf>), NodeError> {
    let path = std::env::var_os(CONFIG_PATH_VAR)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = FarmConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = FarmConfig::default();
        config.apply_env_overrides()?;
        Ok((config, None))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingSection) -> Result<(), NodeError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| NodeError::Logging {
            message: format!("invalid log filter {:?}: {e}", logging.level),
        })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| NodeError::Logging {
        message: e.to_string(),
    })
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C, shutdown by signal disabled"),
        }
    });
}

fn server_config(config: &FarmConfig) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.listen_port(),
    }
}

/// Farm dashboard: simulator plus ingest and query endpoints.
async fn run_farm(config: &FarmConfig, shutdown: CancellationToken) -> Result<(), NodeError> {
    let store = Arc::new(ObservationStore::with_farm_defaults());

    let simulator = if config.simulation.enabled {
        let producer =
            SimulatedProducer::new(Arc::clone(&store), config.simulation.tick_interval());
        Some(tokio::spawn(producer.run(shutdown.child_token())))
    } else {
        info!("Simulation disabled, store changes only through ingest");
        None
    };

    let state = AppState::farm(store, config.ingest.default_source.as_str())
        .with_refresh_interval(config.dashboard.refresh_interval_ms);
    let served = start_server(&server_config(config), Arc::new(state), shutdown.clone()).await;

    // The simulator must stop even if the server failed to start.
    shutdown.cancel();
    if let Some(handle) = simulator {
        if let Err(e) = handle.await {
            warn!(error = %e, "Simulation task did not shut down cleanly");
        }
    }

    served.map_err(NodeError::from)
}

/// Relay source: update form plus best-effort receiver notification.
async fn run_relay_source(config: &FarmConfig, shutdown: CancellationToken) -> Result<(), NodeError> {
    let webhook_url = config.relay.webhook_url.trim();
    let forwarder = if webhook_url.is_empty() {
        info!("No webhook URL configured, updates stay local");
        None
    } else {
        let forwarder = RelayForwarder::new(webhook_url, config.relay.request_timeout())?;
        info!(url = forwarder.webhook_url(), "Relay forwarder configured");
        Some(Arc::new(forwarder))
    };

    let state = AppState::relay_source(forwarder);
    start_server(&server_config(config), Arc::new(state), shutdown).await?;
    Ok(())
}

/// Relay receiver in push (webhook) or poll mode.
async fn run_relay_receiver(
    config: &FarmConfig,
    shutdown: CancellationToken,
) -> Result<(), NodeError> {
    let state = match config.relay.mode {
        ReceiveMode::Push => AppState::relay_receiver_push(),
        ReceiveMode::Poll => {
            let slot = Arc::new(LatestValue::new(ReceivedValue::waiting(POLL_PLACEHOLDER)));
            let poller = RelayPoller::new(
                config.relay.poll_url.as_str(),
                config.relay.poll_interval(),
                config.relay.request_timeout(),
                slot,
            )?;
            AppState::relay_receiver_poll(Arc::new(poller), shutdown.clone())
        }
    };
    let state = Arc::new(state);

    if config.relay.mode == ReceiveMode::Poll && config.relay.poll_on_startup {
        state.start_polling();
    }

    let served = start_server(&server_config(config), Arc::clone(&state), shutdown.clone()).await;

    shutdown.cancel();
    if let Some(handle) = state.take_polling_handle() {
        if let Err(e) = handle.await {
            warn!(error = %e, "Poll task did not shut down cleanly");
        }
    }

    served.map_err(NodeError::from)
}

/// Sensor client: post random batches until cancelled or done.
async fn run_sensor(config: &FarmConfig, shutdown: CancellationToken) -> Result<(), NodeError> {
    let client = SensorClient::from_config(&config.sensor)?;
    info!(url = client.ingest_url(), "Sensor client targeting farm server");
    client.run(shutdown).await;
    Ok(())
}
