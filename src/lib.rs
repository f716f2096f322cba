//! # Gyrohub
//!
//! Real-time vibration telemetry hub: ingests sensor readings from a
//! publish/subscribe messaging bus, persists them through a document
//! store, and fans live data out to any number of concurrently
//! connected WebSocket clients, each folding its stream through a
//! private sliding window. A file-backed notification relay delivers
//! pending per-user records over a second WebSocket channel.
//!
//! ## Modules
//!
//! - [`telemetry`]: envelope data model and sliding-window transform
//! - [`bus`]: messaging-bus seam (subscribe/publish behind a channel)
//! - [`store`]: document-store collaborator trait and clients
//! - [`ingest`]: the single ingestion subscriber task
//! - [`websocket`]: fan-out hub, session handlers and frame types
//! - [`notify`]: the file-backed notification relay
//! - [`api`]: Axum router, server and health probes
//!
//! ## Pipeline
//!
//! ```text
//! bus payload -> ingest -> { store (persist), hub (distribute), bus (mirror) }
//!                              hub -> per-session window -> WebSocket frame
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use gyrohub::api::{serve, AppState};
//! use gyrohub::config::Config;
//! use gyrohub::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let addr = config.server.addr();
//!     let state = AppState::new(config, Arc::new(MemoryStore::new()));
//!     serve(state, &addr).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bus;
pub mod config;
pub mod ingest;
pub mod notify;
pub mod store;
pub mod telemetry;
pub mod websocket;

// Re-export top-level types for convenience
pub use telemetry::{AxisReading, AxisSet, SampleField, SlidingWindow, TelemetryEnvelope};

pub use bus::{BusError, BusResult, InProcessBus, MessageBus};

pub use store::{
    DeviceRecord, HttpStore, HttpStoreConfig, MemoryStore, StoreError, StoreResult,
    TelemetryStore, UserRecord,
};

pub use ingest::{IngestOutcome, Subscriber};

pub use websocket::{
    notification_handler, telemetry_handler, HubConfig, HubError, SessionId, StreamHub,
    WindowFrame,
};

pub use notify::{NotificationRelay, RelayError, RelayResult};

pub use api::{build_router, serve, ApiError, ApiResult, AppState};

pub use config::{Config, ConfigError, StoreBackend};
