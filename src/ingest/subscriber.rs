//! Ingestion subscriber
//!
//! One task consumes the bus subscription channel for the lifetime of
//! the process. Every failure while handling a payload is confined to
//! that single message: the payload is dropped, the reason logged, and
//! the loop moves on. Only the initial subscribe (done by the caller)
//! can be fatal.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bus::MessageBus;
use crate::store::TelemetryStore;
use crate::telemetry::TelemetryEnvelope;
use crate::websocket::StreamHub;

/// What happened to one inbound payload
#[derive(Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Persisted and distributed to `sessions` live sessions
    Accepted { sessions: usize },
    /// Zero-length payload
    EmptyPayload,
    /// Payload did not decode as a telemetry envelope
    Malformed,
    /// Envelope lacked a device or user identifier
    MissingIdentifiers,
    /// Device id is not registered in the document store
    UnknownDevice,
    /// User id is not registered in the document store
    UnknownUser,
    /// Store lookup failed
    LookupFailed,
    /// Envelope carried no measurement data
    EmptyEnvelope,
    /// Envelope was valid but persistence failed
    PersistFailed,
}

/// Consumes the inbound subscription and feeds the pipeline
pub struct Subscriber {
    store: Arc<dyn TelemetryStore>,
    hub: Arc<StreamHub>,
    bus: Arc<dyn MessageBus>,
    /// Topic raw payloads are mirrored to after persistence, if any
    mirror_topic: Option<String>,
}

impl Subscriber {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        hub: Arc<StreamHub>,
        bus: Arc<dyn MessageBus>,
        mirror_topic: Option<String>,
    ) -> Self {
        Self {
            store,
            hub,
            bus,
            mirror_topic,
        }
    }

    /// Run the ingestion loop until the subscription channel closes
    pub async fn run(self, mut inbound: mpsc::Receiver<Vec<u8>>) {
        tracing::info!("ingestion subscriber started");
        while let Some(payload) = inbound.recv().await {
            self.handle_payload(&payload).await;
        }
        tracing::warn!("bus subscription channel closed, ingestion stopped");
    }

    /// Process one raw payload through validation, persistence and fan-out
    pub async fn handle_payload(&self, payload: &[u8]) -> IngestOutcome {
        if payload.is_empty() {
            tracing::warn!("dropping empty bus payload");
            return IngestOutcome::EmptyPayload;
        }

        let envelope = match TelemetryEnvelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable bus payload");
                return IngestOutcome::Malformed;
            }
        };

        if !envelope.has_identifiers() {
            tracing::warn!(
                device_id = %envelope.device_id,
                user_id = %envelope.user_id,
                "dropping envelope without routing identifiers"
            );
            return IngestOutcome::MissingIdentifiers;
        }

        match self.store.find_device(&envelope.device_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(device_id = %envelope.device_id, "dropping envelope for unknown device");
                return IngestOutcome::UnknownDevice;
            }
            Err(e) => {
                tracing::warn!(device_id = %envelope.device_id, error = %e, "device lookup failed");
                return IngestOutcome::LookupFailed;
            }
        }

        match self.store.find_user(&envelope.user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(user_id = %envelope.user_id, "dropping envelope for unknown user");
                return IngestOutcome::UnknownUser;
            }
            Err(e) => {
                tracing::warn!(user_id = %envelope.user_id, error = %e, "user lookup failed");
                return IngestOutcome::LookupFailed;
            }
        }

        // A default-constructed decode: no data worth keeping, and not
        // an error either.
        if envelope.is_empty() {
            tracing::debug!(device_id = %envelope.device_id, "dropping empty envelope");
            return IngestOutcome::EmptyEnvelope;
        }

        if let Err(e) = self.store.persist(&envelope).await {
            tracing::warn!(device_id = %envelope.device_id, error = %e, "failed to persist reading");
            return IngestOutcome::PersistFailed;
        }

        let sessions = self.hub.distribute(envelope).await;

        if let Some(topic) = &self.mirror_topic {
            if let Err(e) = self.bus.publish(topic, payload.to_vec()).await {
                tracing::warn!(topic = %topic, error = %e, "failed to mirror payload");
            }
        }

        IngestOutcome::Accepted { sessions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InProcessBus;
    use crate::store::{DeviceRecord, MemoryStore, UserRecord};
    use crate::websocket::HubConfig;

    fn valid_payload() -> Vec<u8> {
        br#"{
            "deviceID": "dev-1",
            "userID": "user-1",
            "TimeStamp": 1699000000,
            "data": {
                "X": {"Acceleration": 0.5},
                "Y": {"Acceleration": 0.6},
                "Z": {"Acceleration": 9.8},
                "Temperature": 22.0
            }
        }"#
        .to_vec()
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .add_device(DeviceRecord {
                device_id: "dev-1".to_string(),
                device_name: "pump-3".to_string(),
                create_date: None,
                bookmark: false,
                usage: 0,
                status: true,
            })
            .await;
        store
            .add_user(UserRecord {
                user_id: "user-1".to_string(),
                username: "operator".to_string(),
                email: "op@example.com".to_string(),
            })
            .await;
        store
    }

    fn subscriber(
        store: Arc<MemoryStore>,
        hub: Arc<StreamHub>,
        bus: Arc<InProcessBus>,
        mirror: Option<&str>,
    ) -> Subscriber {
        Subscriber::new(store, hub, bus, mirror.map(str::to_string))
    }

    #[tokio::test]
    async fn test_empty_payload_dropped() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));

        let sub = subscriber(Arc::clone(&store), hub, bus, None);
        assert_eq!(sub.handle_payload(b"").await, IngestOutcome::EmptyPayload);
        assert_eq!(store.reading_count().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_payload_dropped() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));

        let sub = subscriber(Arc::clone(&store), hub, bus, None);
        assert_eq!(sub.handle_payload(b"{{nope").await, IngestOutcome::Malformed);
        assert_eq!(store.reading_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_identifiers_dropped() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));

        let sub = subscriber(Arc::clone(&store), hub, bus, None);
        let outcome = sub
            .handle_payload(br#"{"deviceID":"dev-1","data":{"Temperature":20.0}}"#)
            .await;
        assert_eq!(outcome, IngestOutcome::MissingIdentifiers);
    }

    #[tokio::test]
    async fn test_unknown_device_dropped() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));

        let sub = subscriber(Arc::clone(&store), hub, bus, None);
        let outcome = sub
            .handle_payload(br#"{"deviceID":"dev-9","userID":"user-1","data":{"Temperature":20.0}}"#)
            .await;
        assert_eq!(outcome, IngestOutcome::UnknownDevice);
        assert_eq!(store.reading_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_user_dropped() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));

        let sub = subscriber(Arc::clone(&store), hub, bus, None);
        let outcome = sub
            .handle_payload(br#"{"deviceID":"dev-1","userID":"user-9","data":{"Temperature":20.0}}"#)
            .await;
        assert_eq!(outcome, IngestOutcome::UnknownUser);
    }

    #[tokio::test]
    async fn test_empty_envelope_neither_persisted_nor_distributed() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        hub.register(tx, "dev-1").await.unwrap();

        let sub = subscriber(Arc::clone(&store), Arc::clone(&hub), bus, None);
        let outcome = sub
            .handle_payload(br#"{"deviceID":"dev-1","userID":"user-1"}"#)
            .await;

        assert_eq!(outcome, IngestOutcome::EmptyEnvelope);
        assert_eq!(store.reading_count().await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_valid_payload_persisted_and_distributed() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        hub.register(tx, "dev-1").await.unwrap();

        let sub = subscriber(Arc::clone(&store), Arc::clone(&hub), bus, None);
        let outcome = sub.handle_payload(&valid_payload()).await;

        assert_eq!(outcome, IngestOutcome::Accepted { sessions: 1 });
        assert_eq!(store.reading_count().await, 1);
        assert_eq!(store.last_reading().await.unwrap().device_id, "dev-1");
        assert_eq!(rx.recv().await.unwrap().data.z.acceleration, 9.8);
    }

    #[tokio::test]
    async fn test_accepted_payload_mirrored_raw() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));
        let mut mirror_rx = bus.subscribe("vibration/mirror").await.unwrap();

        let sub = subscriber(store, hub, Arc::clone(&bus), Some("vibration/mirror"));
        sub.handle_payload(&valid_payload()).await;

        assert_eq!(mirror_rx.recv().await.unwrap(), valid_payload());
    }

    #[tokio::test]
    async fn test_dropped_payload_not_mirrored() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));
        let mut mirror_rx = bus.subscribe("vibration/mirror").await.unwrap();

        let sub = subscriber(store, hub, Arc::clone(&bus), Some("vibration/mirror"));
        sub.handle_payload(b"{{nope").await;

        assert!(mirror_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_consumes_until_channel_closes() {
        let store = seeded_store().await;
        let hub = Arc::new(StreamHub::new(HubConfig::default()));
        let bus = Arc::new(InProcessBus::new(8));

        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let sub = subscriber(Arc::clone(&store), hub, bus, None);
        let handle = tokio::spawn(sub.run(rx));

        tx.send(valid_payload()).await.unwrap();
        tx.send(b"{{nope".to_vec()).await.unwrap();
        tx.send(valid_payload()).await.unwrap();
        drop(tx);

        handle.await.unwrap();
        assert_eq!(store.reading_count().await, 2);
    }
}
