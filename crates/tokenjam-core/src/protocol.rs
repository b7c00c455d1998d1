//! Wire messages exchanged with clients.
//!
//! Every outbound frame is a full, authoritative snapshot; clients must
//! never treat one as a delta, since intermediate frames may be dropped.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::SubscriberId;
use crate::token::Token;

/// Sentinel reported as `assignedTokenId` for spectators.
pub const NO_TOKEN: i64 = -1;

/// Inbound position update for the sender's own token.
///
/// The token is implied by the connection's assignment; clients cannot
/// name a token. Accepts the legacy `PuzzleID`/`X`/`Y` field names.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    /// Puzzle the client believes is current.
    #[serde(alias = "PuzzleID")]
    pub puzzle_id: i64,
    /// New horizontal position.
    #[serde(alias = "X")]
    pub x: f64,
    /// New vertical position.
    #[serde(alias = "Y")]
    pub y: f64,
}

impl PositionUpdate {
    /// Parse a text frame. Returns `None` for malformed payloads, including
    /// non-finite coordinates.
    pub fn parse(frame: &str) -> Option<Self> {
        let update: Self = serde_json::from_str(frame).ok()?;
        (update.x.is_finite() && update.y.is_finite()).then_some(update)
    }
}

/// Operator command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Accept position updates.
    Start,
    /// Stop accepting position updates; the layout is kept.
    Stop,
    /// Move to the previous puzzle.
    Prev,
    /// Move to the next puzzle.
    Next,
    /// Anything else; logged and ignored.
    Unknown(String),
}

impl FromStr for ControlCommand {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "prev" => Self::Prev,
            "next" => Self::Next,
            other => Self::Unknown(other.to_owned()),
        })
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
            Self::Prev => f.write_str("prev"),
            Self::Next => f.write_str("next"),
            Self::Unknown(s) => write!(f, "unknown({s})"),
        }
    }
}

/// Point-in-time session state shared by every subscriber's frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Current puzzle goal.
    pub puzzle_goal: String,
    /// Latest evaluator output.
    pub eval_output: String,
    /// Current token layout.
    pub tokens: Vec<Token>,
    /// Current puzzle index.
    pub puzzle_id: i64,
    /// Subscribers holding a token.
    pub occupant_count: usize,
    /// Subscribers without a token.
    pub spectator_count: usize,
    /// Whether position updates are accepted.
    pub started: bool,
    /// Whether the current puzzle has been cleared.
    pub level_clear: bool,
}

/// One subscriber's outbound frame: the shared snapshot plus its own
/// assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Shared state.
    #[serde(flatten)]
    pub snapshot: Arc<SessionSnapshot>,
    /// The receiving subscriber.
    pub subscriber_id: SubscriberId,
    /// Token the receiver may move, or [`NO_TOKEN`].
    pub assigned_token_id: i64,
}

impl PlayerView {
    /// Stamp `snapshot` for one subscriber.
    pub fn new(
        snapshot: Arc<SessionSnapshot>,
        subscriber_id: SubscriberId,
        token: Option<usize>,
    ) -> Self {
        Self {
            snapshot,
            subscriber_id,
            assigned_token_id: token.map_or(NO_TOKEN, |t| t as i64),
        }
    }

    /// The receiver's token, if it holds one.
    pub fn assigned_token(&self) -> Option<usize> {
        usize::try_from(self.assigned_token_id).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Arc<SessionSnapshot> {
        Arc::new(SessionSnapshot {
            puzzle_goal: "32".into(),
            eval_output: "<n/a>".into(),
            tokens: vec![Token::new("1", 0.2, 0.5)],
            puzzle_id: 1,
            occupant_count: 1,
            spectator_count: 2,
            started: true,
            level_clear: false,
        })
    }

    #[test]
    fn parse_camel_case_update() {
        let u = PositionUpdate::parse(r#"{"puzzleId":2,"x":0.9,"y":0.5}"#).unwrap();
        assert_eq!(u.puzzle_id, 2);
        assert!((u.x - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_legacy_field_names() {
        let u = PositionUpdate::parse(r#"{"PuzzleID":0,"X":0.1,"Y":0.2}"#).unwrap();
        assert_eq!(u.puzzle_id, 0);
        assert!((u.y - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(PositionUpdate::parse("not json").is_none());
        assert!(PositionUpdate::parse(r#"{"puzzleId":0,"x":0.1}"#).is_none());
        assert!(PositionUpdate::parse(r#"{"puzzleId":"a","x":0.1,"y":0.1}"#).is_none());
    }

    #[test]
    fn parse_rejects_non_finite() {
        // 1e999 overflows to infinity.
        assert!(PositionUpdate::parse(r#"{"puzzleId":0,"x":1e999,"y":0.5}"#).is_none());
    }

    #[test]
    fn control_commands_parse() {
        assert_eq!("start".parse::<ControlCommand>().unwrap(), ControlCommand::Start);
        assert_eq!("stop".parse::<ControlCommand>().unwrap(), ControlCommand::Stop);
        assert_eq!("prev".parse::<ControlCommand>().unwrap(), ControlCommand::Prev);
        assert_eq!("next".parse::<ControlCommand>().unwrap(), ControlCommand::Next);
        assert_eq!(
            "reset".parse::<ControlCommand>().unwrap(),
            ControlCommand::Unknown("reset".into())
        );
    }

    #[test]
    fn player_view_wire_shape() {
        let view = PlayerView::new(snapshot(), SubscriberId::from_raw(3), Some(0));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["puzzleGoal"], "32");
        assert_eq!(json["evalOutput"], "<n/a>");
        assert_eq!(json["puzzleId"], 1);
        assert_eq!(json["occupantCount"], 1);
        assert_eq!(json["spectatorCount"], 2);
        assert_eq!(json["assignedTokenId"], 0);
        assert_eq!(json["subscriberId"], 3);
        assert_eq!(json["started"], true);
        assert_eq!(json["levelClear"], false);
        assert_eq!(json["tokens"][0]["label"], "1");
    }

    #[test]
    fn spectator_gets_sentinel() {
        let view = PlayerView::new(snapshot(), SubscriberId::from_raw(4), None);
        assert_eq!(view.assigned_token_id, NO_TOKEN);
        assert_eq!(view.assigned_token(), None);
    }
}
