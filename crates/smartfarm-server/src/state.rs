//! Shared application state for the SmartFarm HTTP server.
//!
//! One [`AppState`] type serves every role. The role (and, for receivers,
//! the receive mode) decides which routes are mounted; fields a role does
//! not use stay at their inert defaults.

use std::sync::Arc;

use parking_lot::Mutex;
use smartfarm_core::relay::{POLL_PLACEHOLDER, PUSH_PLACEHOLDER};
use smartfarm_core::{LatestValue, ObservationStore, ReceiveMode, ReceivedValue, RelayMessage, Role};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::forwarder::RelayForwarder;
use crate::poller::RelayPoller;

/// Default dashboard refresh interval in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2000;

/// Default writer tag for ingest callers that do not identify themselves.
pub const DEFAULT_INGEST_SOURCE: &str = "external";

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState {
    /// The role this server plays.
    pub role: Role,
    /// Receive mode (meaningful for the receiver role only).
    pub mode: ReceiveMode,
    /// Latest sensor observation (farm role).
    pub store: Arc<ObservationStore>,
    /// Writer tag for ingest callers that do not identify themselves.
    pub ingest_source: String,
    /// Dashboard poll interval in milliseconds.
    pub refresh_interval_ms: u64,
    /// The relay source's current message.
    pub outbox: Arc<LatestValue<RelayMessage>>,
    /// Forwarder notified on each relay source update, if configured.
    pub forwarder: Option<Arc<RelayForwarder>>,
    /// The receiver's held value.
    pub inbox: Arc<LatestValue<ReceivedValue>>,
    /// Poller feeding `inbox` (poll mode only).
    pub poller: Option<Arc<RelayPoller>>,
    polling: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl AppState {
    fn base(role: Role, mode: ReceiveMode) -> Self {
        Self {
            role,
            mode,
            store: Arc::new(ObservationStore::with_farm_defaults()),
            ingest_source: DEFAULT_INGEST_SOURCE.to_owned(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            outbox: Arc::new(LatestValue::new(RelayMessage::default())),
            forwarder: None,
            inbox: Arc::new(LatestValue::new(ReceivedValue::waiting(PUSH_PLACEHOLDER))),
            poller: None,
            polling: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// State for a farm dashboard node serving `store`.
    pub fn farm(store: Arc<ObservationStore>, ingest_source: impl Into<String>) -> Self {
        Self {
            store,
            ingest_source: ingest_source.into(),
            ..Self::base(Role::Farm, ReceiveMode::default())
        }
    }

    /// State for a relay source, optionally notifying a receiver.
    pub fn relay_source(forwarder: Option<Arc<RelayForwarder>>) -> Self {
        Self {
            forwarder,
            ..Self::base(Role::RelaySource, ReceiveMode::default())
        }
    }

    /// State for a receiver fed by webhook pushes.
    pub fn relay_receiver_push() -> Self {
        Self::base(Role::RelayReceiver, ReceiveMode::Push)
    }

    /// State for a receiver fed by `poller`.
    ///
    /// Poll loops started through [`AppState::start_polling`] stop when
    /// `shutdown` is cancelled.
    pub fn relay_receiver_poll(poller: Arc<RelayPoller>, shutdown: CancellationToken) -> Self {
        let inbox = poller.slot();
        inbox.replace(ReceivedValue::waiting(POLL_PLACEHOLDER));
        Self {
            inbox,
            poller: Some(poller),
            shutdown,
            ..Self::base(Role::RelayReceiver, ReceiveMode::Poll)
        }
    }

    /// Override the dashboard refresh interval.
    #[must_use]
    pub fn with_refresh_interval(mut self, refresh_interval_ms: u64) -> Self {
        self.refresh_interval_ms = refresh_interval_ms;
        self
    }

    /// Start the poll loop unless one is already running.
    ///
    /// Returns `Some(true)` if a loop was started, `Some(false)` if one was
    /// already running, and `None` if this state has no poller.
    pub fn start_polling(&self) -> Option<bool> {
        let poller = self.poller.as_ref()?;
        let mut running = self.polling.lock();

        if running.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Some(false);
        }

        let handle = tokio::spawn(Arc::clone(poller).run(self.shutdown.child_token()));
        *running = Some(handle);
        info!(url = poller.source_url(), "Poll loop spawned");
        Some(true)
    }

    /// Take the running poll loop handle, if any, so it can be joined.
    pub fn take_polling_handle(&self) -> Option<JoinHandle<()>> {
        self.polling.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farm_state_uses_given_store_and_tag() {
        let store = Arc::new(ObservationStore::with_farm_defaults());
        let state = AppState::farm(Arc::clone(&store), "greenhouse");
        assert_eq!(state.role, Role::Farm);
        assert_eq!(state.ingest_source, "greenhouse");
        assert!(Arc::ptr_eq(&state.store, &store));
    }

    #[test]
    fn push_receiver_starts_with_placeholder() {
        let state = AppState::relay_receiver_push();
        assert_eq!(state.mode, ReceiveMode::Push);
        assert_eq!(state.inbox.get().data, PUSH_PLACEHOLDER);
        assert_eq!(state.start_polling(), None);
    }

    #[test]
    fn source_starts_with_initial_value() {
        let state = AppState::relay_source(None).with_refresh_interval(500);
        assert_eq!(state.role, Role::RelaySource);
        assert_eq!(state.refresh_interval_ms, 500);
        assert_eq!(
            state.outbox.get().data,
            smartfarm_core::relay::INITIAL_SOURCE_DATA
        );
    }
}
