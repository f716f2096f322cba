//! Application state
//!
//! Shared state accessible by all handlers, wrapped in `Arc` for
//! thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::notify::NotificationRelay;
use crate::store::TelemetryStore;
use crate::websocket::{HubConfig, StreamHub};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Full server configuration
    pub config: Arc<Config>,
    /// Fan-out hub for live telemetry sessions
    pub hub: Arc<StreamHub>,
    /// Notification relay over the shared backing file
    pub relay: Arc<NotificationRelay>,
    /// Document-store collaborator
    pub store: Arc<dyn TelemetryStore>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state with a default hub and a relay over the configured file
    pub fn new(config: Config, store: Arc<dyn TelemetryStore>) -> Self {
        let relay = NotificationRelay::new(config.relay.file.clone());
        Self {
            config: Arc::new(config),
            hub: Arc::new(StreamHub::new(HubConfig::default())),
            relay: Arc::new(relay),
            store,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get live telemetry session count
    pub async fn session_count(&self) -> usize {
        self.hub.session_count().await
    }
}
