//! HTTP/WebSocket server
//!
//! The outward-facing surface of the hub, built with Axum.
//!
//! # Endpoints
//!
//! ## Streaming
//! - `GET /ws/telemetry?device=<id>` - sliding-window telemetry frames
//! - `GET /ws/notifications?userID=<id>` - pending notification records
//!
//! ## Health
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness probe
//! - `GET /health` - full health status
//!
//! The simple validate-then-persist REST surface (device registration,
//! bookmarks, auth) lives in a separate service; this server only
//! exposes the streaming pipeline and its probes.

mod error;
mod health;
mod state;

pub use error::{ApiError, ApiResult, ErrorBody, ErrorResponse};
pub use state::AppState;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::websocket::{notification_handler, telemetry_handler};

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let ws_routes = Router::new()
        .route("/telemetry", get(telemetry_handler))
        .route("/notifications", get(notification_handler));

    let health_routes = Router::new()
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/", get(health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/ws", ws_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the server
pub async fn serve(state: AppState, addr: &str) -> Result<(), ApiError> {
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("gyrohub listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("gyrohub shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
