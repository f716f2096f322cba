//! HTTP document-store client
//!
//! REST client for the document-store service holding device and user
//! registrations and persisted readings.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{DeviceRecord, StoreError, StoreResult, TelemetryStore, UserRecord};
use crate::telemetry::TelemetryEnvelope;

/// Configuration for the HTTP store client
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the document-store service
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

/// REST client for the document store
pub struct HttpStore {
    client: Client,
    config: HttpStoreConfig,
}

impl HttpStore {
    /// Create a client with the given configuration
    pub fn new(config: HttpStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn classify(err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_connect() {
            StoreError::Unavailable
        } else {
            StoreError::Request(err)
        }
    }

    async fn fetch_optional<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> StoreResult<Option<T>> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(Self::classify)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let record = response.json::<T>().await.map_err(Self::classify)?;
                Ok(Some(record))
            }
            status => Err(StoreError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl TelemetryStore for HttpStore {
    async fn persist(&self, envelope: &TelemetryEnvelope) -> StoreResult<()> {
        let response = self
            .client
            .post(self.url("/readings"))
            .json(envelope)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn find_device(&self, device_id: &str) -> StoreResult<Option<DeviceRecord>> {
        self.fetch_optional(&format!("/devices/{}", device_id)).await
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        self.fetch_optional(&format!("/users/{}", user_id)).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(Self::classify)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let store = HttpStore::new(HttpStoreConfig {
            base_url: "http://localhost:9090/".to_string(),
            request_timeout_ms: 1000,
        })
        .unwrap();

        assert_eq!(store.url("/devices/d1"), "http://localhost:9090/devices/d1");
    }

    #[test]
    fn test_default_config() {
        let config = HttpStoreConfig::default();
        assert_eq!(config.request_timeout_ms, 5000);
        assert!(config.base_url.starts_with("http://"));
    }
}
