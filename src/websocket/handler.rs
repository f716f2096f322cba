//! WebSocket handlers
//!
//! Connection lifecycle for the two streaming channels:
//!
//! - **Telemetry** (`/ws/telemetry?device=<id>`): the session registers
//!   with the fan-out hub for its target and owns a private sliding
//!   window. A write task folds each routed envelope into the window
//!   and sends the resulting frame; a read task watches for the peer
//!   closing. Whichever task finishes first aborts the other, and the
//!   session is unregistered on the single common exit path.
//!
//! - **Notifications** (`/ws/notifications?userID=<id>`): a poll loop
//!   drains the relay for the user once per tick and forwards matching
//!   record lines. The connection closes after the idle timeout passes
//!   with no delivered record.
//!
//! Missing required parameters are rejected at upgrade time; once a
//! stream is established, failures just end the connection.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::messages::WindowFrame;
use crate::api::AppState;
use crate::notify::NotificationRelay;
use crate::telemetry::{SlidingWindow, TelemetryEnvelope};

/// Query parameters for the telemetry channel
#[derive(Debug, Deserialize)]
pub struct TelemetryParams {
    /// Target identifier; falls back to the configured default
    pub device: Option<String>,
}

/// Query parameters for the notification channel
#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

/// Upgrade handler for the telemetry channel
pub async fn telemetry_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<TelemetryParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let target = params
        .device
        .filter(|d| !d.is_empty())
        .or_else(|| state.config.server.default_device.clone());

    let Some(target) = target else {
        return (StatusCode::BAD_REQUEST, "missing device parameter").into_response();
    };

    ws.on_upgrade(move |socket| telemetry_socket(socket, state, target))
}

/// Drive one telemetry session from upgrade to teardown
async fn telemetry_socket(socket: WebSocket, state: Arc<AppState>, target: String) {
    let (mut sink, stream) = socket.split();
    let (tx, rx) = mpsc::channel(state.config.stream.session_buffer);

    let session_id = match state.hub.register(tx, &target).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(target_id = %target, error = %e, "session rejected");
            let _ = sink.send(Message::Text(e.to_string())).await;
            return;
        }
    };

    let window = SlidingWindow::new(state.config.stream.window_len, state.config.stream.field);

    let mut write_task = tokio::spawn(write_frames(sink, rx, window));
    let mut read_task = tokio::spawn(drain_until_close(stream));

    // First exit wins; the other task is cancelled so the connection
    // handle is released exactly once.
    tokio::select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }

    state.hub.unregister(&session_id).await;
}

/// Write loop: fold routed envelopes into the window, send frames
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<TelemetryEnvelope>>,
    mut window: SlidingWindow,
) {
    // `recv` returns None once the hub drops the session's sender,
    // so an unregistered session winds down through here too.
    while let Some(envelope) = rx.recv().await {
        window.update(&envelope);
        let frame = WindowFrame::new(&envelope, &window);

        match serde_json::to_string(&frame) {
            Ok(text) => {
                if sink.send(Message::Text(text)).await.is_err() {
                    tracing::debug!(device_id = %envelope.device_id, "frame write failed, closing session");
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize window frame");
            }
        }
    }
}

/// Read loop: consume control frames until the peer closes or errors
async fn drain_until_close(mut stream: SplitStream<WebSocket>) {
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) | Err(_) => break,
            // Telemetry clients send nothing meaningful; pings are
            // answered by axum and anything else is ignored.
            Ok(_) => {}
        }
    }
}

/// Upgrade handler for the notification channel
///
/// `userID` is required; the upgrade is rejected without it.
pub async fn notification_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<NotificationParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(user_id) = params.user_id.filter(|u| !u.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing userID parameter").into_response();
    };

    ws.on_upgrade(move |socket| notification_socket(socket, state, user_id))
}

/// Drive one notification session: poll loop plus close detection
async fn notification_socket(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    let (sink, stream) = socket.split();

    tracing::info!(user_id = %user_id, "notification reader connected");

    let relay = Arc::clone(&state.relay);
    let poll_interval = state.config.relay.poll_interval();
    let idle_timeout = state.config.relay.idle_timeout();

    let mut poll_task = tokio::spawn(poll_notifications(
        sink,
        relay,
        user_id.clone(),
        poll_interval,
        idle_timeout,
    ));
    let mut read_task = tokio::spawn(drain_until_close(stream));

    tokio::select! {
        _ = &mut poll_task => read_task.abort(),
        _ = &mut read_task => poll_task.abort(),
    }

    tracing::info!(user_id = %user_id, "notification reader disconnected");
}

/// Poll the relay on a fixed interval and forward matching records
///
/// The idle deadline resets whenever a record is delivered; the loop
/// ends once `idle_timeout` passes without a delivery. The first tick
/// fires immediately, which serves as the initial drain on connect.
async fn poll_notifications(
    mut sink: SplitSink<WebSocket, Message>,
    relay: Arc<NotificationRelay>,
    user_id: String,
    poll_interval: std::time::Duration,
    idle_timeout: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    let mut deadline = Instant::now() + idle_timeout;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let records = match relay.poll(&user_id).await {
                    Ok(records) => records,
                    Err(e) => {
                        // Recoverable: the file may be back next tick.
                        tracing::warn!(user_id = %user_id, error = %e, "notification poll failed");
                        continue;
                    }
                };

                if records.is_empty() {
                    continue;
                }

                for line in records {
                    // Records were already consumed by the poll; a
                    // failed write does not requeue them.
                    if sink.send(Message::Text(line)).await.is_err() {
                        tracing::debug!(user_id = %user_id, "notification write failed");
                        return;
                    }
                }
                deadline = Instant::now() + idle_timeout;
            }
            _ = tokio::time::sleep_until(deadline) => {
                tracing::info!(user_id = %user_id, "notification reader idle timeout");
                return;
            }
        }
    }
}
