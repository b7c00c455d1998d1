//! Level-clear detection.
//!
//! The solved layout must hold continuously for a hold period before the
//! level counts as cleared, so players dragging through the solved
//! configuration do not trigger it. Once cleared the flag is sticky until
//! [`ClearDetector::reset`].

use std::time::{Duration, Instant};

/// Default hold period before a sustained match clears the level.
pub const DEFAULT_HOLD: Duration = Duration::from_secs(2);

/// Debounced, sticky level-clear state.
#[derive(Clone, Debug)]
pub struct ClearDetector {
    hold: Duration,
    matching_since: Option<Instant>,
    level_clear: bool,
}

impl ClearDetector {
    /// Create a detector with the given hold period.
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            matching_since: None,
            level_clear: false,
        }
    }

    /// Feed the current match state observed at `now`.
    ///
    /// Returns `true` only on the observation that clears the level.
    pub fn observe(&mut self, matching: bool, now: Instant) -> bool {
        if self.level_clear {
            return false;
        }
        if !matching {
            self.matching_since = None;
            return false;
        }
        let since = *self.matching_since.get_or_insert(now);
        if now.saturating_duration_since(since) >= self.hold {
            self.level_clear = true;
            return true;
        }
        false
    }

    /// Clear all state; called on puzzle change.
    pub fn reset(&mut self) {
        self.matching_since = None;
        self.level_clear = false;
    }

    /// Whether the level has been cleared.
    pub fn is_clear(&self) -> bool {
        self.level_clear
    }

    /// When the current uninterrupted match began.
    pub fn matching_since(&self) -> Option<Instant> {
        self.matching_since
    }
}

impl Default for ClearDetector {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD)
    }
}
