//! Gyrohub server
//!
//! Run with: cargo run -- [--config <path>]
//!
//! # Configuration
//!
//! Loaded from `--config`, the default locations, or environment
//! variables:
//! - `GYROHUB_HOST` / `GYROHUB_PORT`: bind address
//! - `GYROHUB_BUS_URL` / `GYROHUB_BUS_TOPIC`: inbound subscription
//! - `GYROHUB_STORE_URL`: document-store base URL
//! - `GYROHUB_RELAY_FILE`: notification backing file
//! - `GYROHUB_LOG_LEVEL` / `GYROHUB_LOG_FORMAT`: logging
//! - `RUST_LOG`: overrides the log filter entirely

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gyrohub::api::{serve, AppState};
use gyrohub::bus::{InProcessBus, MessageBus};
use gyrohub::config::{Config, StoreBackend};
use gyrohub::ingest::Subscriber;
use gyrohub::store::{HttpStore, HttpStoreConfig, MemoryStore, TelemetryStore};

#[derive(Debug, Parser)]
#[command(name = "gyrohub", about = "Real-time vibration telemetry hub")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_tracing(&config);

    tracing::info!("Starting gyrohub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Bus topic: {}", config.bus.topic);
    tracing::info!("Notification file: {:?}", config.relay.file);

    // The document store must be reachable before we serve anything.
    let store: Arc<dyn TelemetryStore> = match config.store.backend {
        StoreBackend::Http => {
            tracing::info!("Document store: {}", config.store.base_url);
            let store = HttpStore::new(HttpStoreConfig {
                base_url: config.store.base_url.clone(),
                request_timeout_ms: config.store.request_timeout_ms,
            })?;
            store
                .health_check()
                .await
                .context("document store unreachable")?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::info!("Document store: in-memory (standalone mode)");
            Arc::new(MemoryStore::new())
        }
    };

    // Likewise the inbound subscription; without it there is nothing
    // to ingest. The broker adapter plugs in behind the MessageBus
    // seam.
    let bus: Arc<dyn MessageBus> = Arc::new(InProcessBus::new(config.bus.channel_capacity));
    let inbound = bus
        .subscribe(&config.bus.topic)
        .await
        .context("bus subscription failed")?;

    let addr = config.server.addr();
    let mirror_topic = config.bus.mirror_topic.clone();

    let state = AppState::new(config, Arc::clone(&store));

    let subscriber = Subscriber::new(
        store,
        Arc::clone(&state.hub),
        bus,
        mirror_topic,
    );
    let ingest_handle = tokio::spawn(subscriber.run(inbound));

    serve(state, &addr).await?;

    ingest_handle.abort();
    tracing::info!("gyrohub stopped");

    Ok(())
}

/// Initialize tracing from the logging config
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!(
                "gyrohub={},tower_http=warn",
                config.logging.level
            ))
        });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
