//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;
use tokenjam_runtime::SessionStatus;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"ok"` when the session answers, `"unavailable"` otherwise.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open `WebSocket` connections.
    pub connections: usize,
    /// Session state, when the session answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionStatus>,
}

impl HealthResponse {
    /// Whether the session answered.
    pub fn is_ok(&self) -> bool {
        self.session.is_some()
    }
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    connections: usize,
    session: Option<SessionStatus>,
) -> HealthResponse {
    HealthResponse {
        status: if session.is_some() { "ok" } else { "unavailable" }.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        session,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> SessionStatus {
        SessionStatus {
            puzzle_id: 1,
            puzzle_count: 5,
            started: true,
            level_clear: false,
            subscribers: 3,
            occupants: 2,
            expression: "3 2".into(),
            dropped_snapshots: 0,
        }
    }

    #[test]
    fn ok_with_session() {
        let resp = health_check(Instant::now(), 3, Some(status()));
        assert_eq!(resp.status, "ok");
        assert!(resp.is_ok());
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn unavailable_without_session() {
        let resp = health_check(Instant::now(), 0, None);
        assert_eq!(resp.status, "unavailable");
        assert!(!resp.is_ok());
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, 0, None).uptime_secs >= 59);
    }

    #[test]
    fn serialization() {
        let json = serde_json::to_value(health_check(Instant::now(), 2, Some(status()))).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connections"], 2);
        assert!(json["uptimeSecs"].is_number());
        assert_eq!(json["session"]["puzzleCount"], 5);

        let json = serde_json::to_value(health_check(Instant::now(), 0, None)).unwrap();
        assert!(json.get("session").is_none());
    }
}
