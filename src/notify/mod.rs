//! Notification relay
//!
//! A durable, line-oriented queue of pending notifications shared
//! between an external producer (which appends lines to the backing
//! file) and the per-connection pollers that drain it. See
//! [`NotificationRelay`].

mod relay;

pub use relay::{NotificationRelay, RelayError, RelayResult};
