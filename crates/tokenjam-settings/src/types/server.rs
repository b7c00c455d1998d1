//! Server and logging settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Network and transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Directory served for paths not handled by the API.
    pub static_dir: String,
    /// Outbound snapshots buffered per subscriber before dropping.
    pub send_queue_capacity: usize,
    /// Capacity of the session actor's event queue.
    pub event_queue_capacity: usize,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
    /// WebSocket ping interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// How long session and HTTP tasks get to stop after Ctrl-C.
    pub shutdown_grace_ms: u64,
}

impl ServerSettings {
    /// Ping interval as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            static_dir: "frontend".to_string(),
            send_queue_capacity: 5,
            event_queue_capacity: 128,
            max_message_size: 64 * 1024,
            heartbeat_interval_ms: 30_000,
            shutdown_grace_ms: 5_000,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
