//! Fan-out hub
//!
//! Registry and dispatch engine for live telemetry sessions. Each
//! session registers the sending half of a bounded channel together
//! with the target identifier it wants to receive; `distribute` routes
//! one envelope to every matching session with a non-blocking send, so
//! a slow or gone client never stalls delivery to the others.
//!
//! The registry lock spans a single register/unregister/snapshot, never
//! a send: `distribute` snapshots the matching senders under the read
//! lock, releases it, and only then attempts delivery.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::telemetry::TelemetryEnvelope;

/// Unique identifier for one registered session
pub type SessionId = Uuid;

/// Manages all live telemetry sessions and envelope routing
pub struct StreamHub {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    config: HubConfig,
}

/// Configuration for the fan-out hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { max_sessions: 1000 }
    }
}

/// Registry entry for one session
struct SessionHandle {
    /// Device or user identifier this session receives
    target_id: String,
    /// Bounded channel into the session's write task
    sender: mpsc::Sender<Arc<TelemetryEnvelope>>,
}

/// Errors that can occur in the fan-out hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("too many sessions (limit: {0})")]
    TooManySessions(usize),
}

impl StreamHub {
    /// Create a new hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a new session for `target_id`
    ///
    /// The hub takes ownership of the only sending half of the
    /// session's channel; unregistering drops it, which closes the
    /// session's receive loop.
    pub async fn register(
        &self,
        sender: mpsc::Sender<Arc<TelemetryEnvelope>>,
        target_id: impl Into<String>,
    ) -> Result<SessionId, HubError> {
        let target_id = target_id.into();
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.config.max_sessions {
            return Err(HubError::TooManySessions(self.config.max_sessions));
        }

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            SessionHandle {
                target_id: target_id.clone(),
                sender,
            },
        );
        drop(sessions);

        tracing::info!(session_id = %id, target_id = %target_id, "session registered");
        Ok(id)
    }

    /// Remove a session; safe to call more than once
    ///
    /// Returns whether the entry was still present. A second call is a
    /// no-op, which makes the teardown path safe to race against a
    /// concurrent distribution pass.
    pub async fn unregister(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "session unregistered");
        }
        removed.is_some()
    }

    /// Route one envelope to every session whose target matches
    ///
    /// A session matches when its target equals the envelope's device
    /// id or user id. Sends are non-blocking: a full channel means the
    /// client is not keeping up and a closed channel means it is gone;
    /// either way that session alone is unregistered and delivery to
    /// the rest continues. Returns the number of sessions delivered to.
    pub async fn distribute(&self, envelope: TelemetryEnvelope) -> usize {
        let envelope = Arc::new(envelope);

        let matches: Vec<(SessionId, mpsc::Sender<Arc<TelemetryEnvelope>>)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, handle)| {
                    handle.target_id == envelope.device_id || handle.target_id == envelope.user_id
                })
                .map(|(id, handle)| (*id, handle.sender.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut stale = Vec::new();

        for (id, sender) in matches {
            match sender.try_send(Arc::clone(&envelope)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(session_id = %id, "session not keeping up, dropping it");
                    stale.push(id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(session_id = %id, "session channel closed");
                    stale.push(id);
                }
            }
        }

        for id in stale {
            self.unregister(&id).await;
        }

        delivered
    }

    /// Current number of registered sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_for(device_id: &str, user_id: &str) -> TelemetryEnvelope {
        TelemetryEnvelope {
            device_id: device_id.to_string(),
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = StreamHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::channel(4);

        let id = hub.register(tx, "dev-1").await.unwrap();
        assert_eq!(hub.session_count().await, 1);

        assert!(hub.unregister(&id).await);
        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let hub = StreamHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::channel(4);

        let id = hub.register(tx, "dev-1").await.unwrap();
        assert!(hub.unregister(&id).await);
        assert!(!hub.unregister(&id).await);
        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_session_limit() {
        let hub = StreamHub::new(HubConfig { max_sessions: 1 });
        let (tx1, _rx1) = mpsc::channel(4);
        let (tx2, _rx2) = mpsc::channel(4);

        hub.register(tx1, "dev-1").await.unwrap();
        let result = hub.register(tx2, "dev-2").await;
        assert!(matches!(result, Err(HubError::TooManySessions(1))));
    }

    #[tokio::test]
    async fn test_distribute_to_matching_target_only() {
        let hub = StreamHub::new(HubConfig::default());
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);

        hub.register(tx1, "dev-1").await.unwrap();
        hub.register(tx2, "dev-2").await.unwrap();

        let delivered = hub.distribute(envelope_for("dev-1", "user-1")).await;
        assert_eq!(delivered, 1);

        assert_eq!(rx1.recv().await.unwrap().device_id, "dev-1");
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_distribute_broadcasts_to_shared_target() {
        let hub = StreamHub::new(HubConfig::default());
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);

        hub.register(tx1, "dev-1").await.unwrap();
        hub.register(tx2, "dev-1").await.unwrap();

        let delivered = hub.distribute(envelope_for("dev-1", "user-1")).await;
        assert_eq!(delivered, 2);

        assert_eq!(rx1.recv().await.unwrap().device_id, "dev-1");
        assert_eq!(rx2.recv().await.unwrap().device_id, "dev-1");
    }

    #[tokio::test]
    async fn test_user_id_also_matches() {
        let hub = StreamHub::new(HubConfig::default());
        let (tx, mut rx) = mpsc::channel(4);

        hub.register(tx, "user-1").await.unwrap();

        let delivered = hub.distribute(envelope_for("dev-1", "user-1")).await;
        assert_eq!(delivered, 1);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_slow_session_does_not_block_healthy_one() {
        let hub = StreamHub::new(HubConfig::default());
        // A stalled session: capacity 1, never drained.
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (healthy_tx, mut healthy_rx) = mpsc::channel(4);

        hub.register(slow_tx, "dev-1").await.unwrap();
        hub.register(healthy_tx, "dev-1").await.unwrap();

        // First envelope fills the slow session's buffer.
        hub.distribute(envelope_for("dev-1", "user-1")).await;
        // Second one finds it full; the slow session is dropped, the
        // healthy one still receives.
        hub.distribute(envelope_for("dev-1", "user-1")).await;

        assert_eq!(hub.session_count().await, 1);
        assert!(healthy_rx.recv().await.is_some());
        assert!(healthy_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_distribute_after_peer_teardown() {
        let hub = StreamHub::new(HubConfig::default());
        let (tx, rx) = mpsc::channel(4);

        hub.register(tx, "dev-1").await.unwrap();
        // Peer side went away without unregistering first.
        drop(rx);

        let delivered = hub.distribute(envelope_for("dev-1", "user-1")).await;
        assert_eq!(delivered, 0);
        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_distribute_with_no_sessions() {
        let hub = StreamHub::new(HubConfig::default());
        assert_eq!(hub.distribute(envelope_for("dev-1", "user-1")).await, 0);
    }
}
