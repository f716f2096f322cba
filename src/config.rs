//! Configuration system
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides
//! (`GYROHUB_*`).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::telemetry::{SampleField, DEFAULT_WINDOW_LEN};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Telemetry target used when a client supplies no `device` param
    #[serde(default)]
    pub default_device: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_device: None,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Messaging bus configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Topic the ingestion subscriber consumes
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Topic accepted raw payloads are mirrored to; disabled when unset
    #[serde(default)]
    pub mirror_topic: Option<String>,

    /// Capacity of the subscription channel
    #[serde(default = "default_bus_capacity")]
    pub channel_capacity: usize,
}

fn default_broker_url() -> String {
    "tcp://localhost:1883".to_string()
}

fn default_client_id() -> String {
    "gyrohub".to_string()
}

fn default_topic() -> String {
    "vibration".to_string()
}

fn default_bus_capacity() -> usize {
    256
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            client_id: default_client_id(),
            topic: default_topic(),
            mirror_topic: None,
            channel_capacity: default_bus_capacity(),
        }
    }
}

/// Document-store collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    #[serde(default = "default_store_url")]
    pub base_url: String,

    #[serde(default = "default_store_timeout")]
    pub request_timeout_ms: u64,
}

/// Which store implementation the server runs against
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// REST document-store service
    #[default]
    Http,
    /// In-process store, for standalone runs
    Memory,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Http
}

fn default_store_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_store_timeout() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            base_url: default_store_url(),
            request_timeout_ms: default_store_timeout(),
        }
    }
}

/// Sliding-window and per-session channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Samples per axis in each session's window
    #[serde(default = "default_window_len")]
    pub window_len: usize,

    /// Which measurement the window folds over
    #[serde(default)]
    pub field: SampleField,

    /// Capacity of each session's envelope channel
    #[serde(default = "default_session_buffer")]
    pub session_buffer: usize,
}

fn default_window_len() -> usize {
    DEFAULT_WINDOW_LEN
}

fn default_session_buffer() -> usize {
    64
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_len: default_window_len(),
            field: SampleField::default(),
            session_buffer: default_session_buffer(),
        }
    }
}

/// Notification relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Backing file holding pending notification records
    #[serde(default = "default_relay_file")]
    pub file: PathBuf,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_relay_file() -> PathBuf {
    PathBuf::from("notifications.json")
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_idle_timeout() -> u64 {
    60
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            file: default_relay_file(),
            poll_interval_ms: default_poll_interval(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("gyrohub").join("config.toml")),
            Some(PathBuf::from("/etc/gyrohub/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("GYROHUB_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("GYROHUB_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(device) = std::env::var("GYROHUB_DEFAULT_DEVICE") {
            self.server.default_device = Some(device);
        }

        if let Ok(url) = std::env::var("GYROHUB_BUS_URL") {
            self.bus.broker_url = url;
        }
        if let Ok(topic) = std::env::var("GYROHUB_BUS_TOPIC") {
            self.bus.topic = topic;
        }
        if let Ok(topic) = std::env::var("GYROHUB_BUS_MIRROR_TOPIC") {
            self.bus.mirror_topic = Some(topic);
        }

        if let Ok(url) = std::env::var("GYROHUB_STORE_URL") {
            self.store.base_url = url;
        }

        if let Ok(file) = std::env::var("GYROHUB_RELAY_FILE") {
            self.relay.file = PathBuf::from(file);
        }

        if let Ok(level) = std::env::var("GYROHUB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("GYROHUB_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8082);
        assert_eq!(config.bus.topic, "vibration");
        assert_eq!(config.stream.window_len, DEFAULT_WINDOW_LEN);
        assert_eq!(config.stream.field, SampleField::Acceleration);
        assert_eq!(config.relay.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.relay.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.store.backend, StoreBackend::Http);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000
            default_device = "dev-1"

            [stream]
            window_len = 100
            field = "vibration_speed"

            [store]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.default_device.as_deref(), Some("dev-1"));
        assert_eq!(config.stream.window_len, 100);
        assert_eq!(config.stream.field, SampleField::VibrationSpeed);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        // Untouched sections keep their defaults.
        assert_eq!(config.bus.topic, "vibration");
    }

    #[test]
    fn test_addr_format() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8082,
            default_device: None,
        };
        assert_eq!(server.addr(), "127.0.0.1:8082");
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = Config::load(Path::new("/nonexistent/gyrohub.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
