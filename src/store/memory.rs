//! In-memory document store
//!
//! Backing store for tests and standalone runs. Devices and users are
//! seeded up front; persisted readings are retained in insertion order.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DeviceRecord, StoreResult, TelemetryStore, UserRecord};
use crate::telemetry::TelemetryEnvelope;

/// In-process store with seeded registrations
#[derive(Default)]
pub struct MemoryStore {
    devices: RwLock<HashMap<String, DeviceRecord>>,
    users: RwLock<HashMap<String, UserRecord>>,
    readings: RwLock<Vec<TelemetryEnvelope>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device for subsequent lookups
    pub async fn add_device(&self, record: DeviceRecord) {
        self.devices
            .write()
            .await
            .insert(record.device_id.clone(), record);
    }

    /// Register a user for subsequent lookups
    pub async fn add_user(&self, record: UserRecord) {
        self.users
            .write()
            .await
            .insert(record.user_id.clone(), record);
    }

    /// Number of readings persisted so far
    pub async fn reading_count(&self) -> usize {
        self.readings.read().await.len()
    }

    /// Most recently persisted reading, if any
    pub async fn last_reading(&self) -> Option<TelemetryEnvelope> {
        self.readings.read().await.last().cloned()
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn persist(&self, envelope: &TelemetryEnvelope) -> StoreResult<()> {
        self.readings.write().await.push(envelope.clone());
        Ok(())
    }

    async fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceRecord>> {
        Ok(self.devices.read().await.get(device_id).cloned())
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> DeviceRecord {
        DeviceRecord {
            device_id: id.to_string(),
            device_name: "pump-3".to_string(),
            create_date: None,
            bookmark: false,
            usage: 0,
            status: true,
        }
    }

    #[tokio::test]
    async fn test_lookup_after_seed() {
        let store = MemoryStore::new();
        store.add_device(device("dev-1")).await;

        let found = store.find_device("dev-1").await.unwrap();
        assert_eq!(found.unwrap().device_name, "pump-3");
        assert!(store.find_device("dev-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_retains_order() {
        let store = MemoryStore::new();
        let mut envelope = TelemetryEnvelope::default();

        envelope.device_id = "a".to_string();
        store.persist(&envelope).await.unwrap();
        envelope.device_id = "b".to_string();
        store.persist(&envelope).await.unwrap();

        assert_eq!(store.reading_count().await, 2);
        assert_eq!(store.last_reading().await.unwrap().device_id, "b");
    }
}
