//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]`. Each type implements
//! [`Default`] with production values, and `#[serde(default)]` lets a
//! settings file name only the fields it changes.

mod server;
mod session;

pub use server::*;
pub use session::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9001 },
///   "evaluator": { "timeoutMs": 2000 },
///   "catalogPath": "/etc/tokenjam/puzzles.json"
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Network and transport settings.
    pub server: ServerSettings,
    /// Session timing settings.
    pub session: SessionSettings,
    /// Expression evaluator settings.
    pub evaluator: EvaluatorSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// JSON puzzle catalog; the built-in catalog is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<String>,
}

impl Settings {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, u64); 8] = [
            ("server.sendQueueCapacity", self.server.send_queue_capacity as u64),
            ("server.eventQueueCapacity", self.server.event_queue_capacity as u64),
            ("server.heartbeatIntervalMs", self.server.heartbeat_interval_ms),
            ("session.clearCheckIntervalMs", self.session.clear_check_interval_ms),
            ("session.staleAfterMs", self.session.stale_after_ms),
            ("session.staleSweepIntervalMs", self.session.stale_sweep_interval_ms),
            ("evaluator.tickMs", self.evaluator.tick_ms),
            ("evaluator.timeoutMs", self.evaluator.timeout_ms),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(SettingsError::InvalidValue(format!("{name} must be positive")));
            }
        }
        if self.evaluator.program.is_empty() {
            return Err(SettingsError::InvalidValue(
                "evaluator.program must not be empty".into(),
            ));
        }
        if !self.evaluator.template.contains(EXPRESSION_PLACEHOLDER) {
            return Err(SettingsError::InvalidValue(format!(
                "evaluator.template must contain {EXPRESSION_PLACEHOLDER}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["server"]["sendQueueCapacity"], 5);
        assert_eq!(json["session"]["clearHoldMs"], 2000);
        assert_eq!(json["evaluator"]["maxOutputBytes"], 65_536);
        assert!(json.get("catalogPath").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"server":{"port":9001}}"#).unwrap();
        assert_eq!(s.server.port, 9001);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.evaluator.tick_ms, 100);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut s = Settings::default();
        s.evaluator.tick_ms = 0;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("evaluator.tickMs"));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let mut s = Settings::default();
        s.evaluator.template = "main = print 1".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn empty_program_is_rejected() {
        let mut s = Settings::default();
        s.evaluator.program.clear();
        assert!(s.validate().is_err());
    }
}
