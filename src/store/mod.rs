//! Document-store collaborator
//!
//! The ingestion pipeline talks to an external document store through
//! the [`TelemetryStore`] trait: persist a reading, look up a device or
//! user by id, and a startup health check. Lookups are plain existence
//! checks; no query semantics are required.
//!
//! Two implementations are provided:
//! - [`HttpStore`]: REST client against the document-store service
//! - [`MemoryStore`]: in-process store for tests and standalone runs

mod http;
mod memory;

pub use http::{HttpStore, HttpStoreConfig};
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::telemetry::TelemetryEnvelope;

/// A registered device, as stored by the document store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceRecord {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "deviceName", default)]
    pub device_name: String,
    #[serde(rename = "createDate", default)]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bookmark: bool,
    #[serde(default)]
    pub usage: i64,
    #[serde(default)]
    pub status: bool,
}

/// A registered user, as stored by the document store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Errors from document-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Request exceeded the configured timeout
    #[error("document store request timed out")]
    Timeout,

    /// Store could not be reached
    #[error("document store unavailable")]
    Unavailable,

    /// Transport-level failure
    #[error("document store request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Store answered with a non-success status
    #[error("document store error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence and lookup operations consumed by the ingestion path
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Persist one validated reading
    async fn persist(&self, envelope: &TelemetryEnvelope) -> StoreResult<()>;

    /// Look up a device by id; `None` means not registered
    async fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceRecord>>;

    /// Look up a user by id; `None` means not registered
    async fn find_user(&self, user_id: &str) -> StoreResult<Option<UserRecord>>;

    /// Verify the store is reachable; fatal at startup if not
    async fn health_check(&self) -> StoreResult<()>;
}
