//! WebSocket real-time streaming
//!
//! Fan-out of live telemetry and pending notifications to connected
//! clients.
//!
//! ## Architecture
//!
//! - **StreamHub**: session registry and envelope dispatch engine
//! - **Handlers**: connection upgrade and per-session read/write tasks
//! - **Messages**: outbound frame formats
//!
//! ## Channels
//!
//! Clients connect to one of two endpoints:
//! - `/ws/telemetry?device=<id>` - sliding-window frames for one
//!   device (or user) stream, one frame per ingested envelope
//! - `/ws/notifications?userID=<id>` - pending notification records
//!   for one user, delivered at poll granularity
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8082/ws/telemetry?device=dev-1');
//!
//! ws.onmessage = (event) => {
//!   const frame = JSON.parse(event.data);
//!   console.log('x window:', frame.x);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::{notification_handler, telemetry_handler, NotificationParams, TelemetryParams};
pub use hub::{HubConfig, HubError, SessionId, StreamHub};
pub use messages::WindowFrame;
