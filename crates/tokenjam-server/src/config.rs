//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use tokenjam_settings::ServerSettings;

/// Configuration for the HTTP + `WebSocket` listener.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` to auto-assign).
    pub port: u16,
    /// Directory served for unmatched paths.
    pub static_dir: PathBuf,
    /// Max inbound `WebSocket` message size in bytes.
    pub max_message_size: usize,
    /// Interval between pings on each connection.
    pub heartbeat_interval: Duration,
}

impl ServerConfig {
    /// Derive from the `server` settings section.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            static_dir: PathBuf::from(&settings.static_dir),
            max_message_size: settings.max_message_size,
            heartbeat_interval: settings.heartbeat_interval(),
        }
    }

    /// `host:port` as given to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_settings(&ServerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listens_on_all_interfaces() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8001");
        assert_eq!(cfg.static_dir, PathBuf::from("frontend"));
    }

    #[test]
    fn follows_settings() {
        let settings = ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 512,
            heartbeat_interval_ms: 5_000,
            ..ServerSettings::default()
        };
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
        assert_eq!(cfg.max_message_size, 512);
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(5));
    }
}
