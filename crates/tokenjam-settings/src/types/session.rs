//! Session timing and evaluator settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the expression in [`EvaluatorSettings::template`].
pub const EXPRESSION_PLACEHOLDER: &str = "{expression}";

/// Session timing settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// How long the reading-order layout must persist to clear a level.
    pub clear_hold_ms: u64,
    /// How often the level-clear condition is re-checked without events.
    pub clear_check_interval_ms: u64,
    /// Idle time after which a token holder counts as stale.
    pub stale_after_ms: u64,
    /// How often stale holders are swept.
    pub stale_sweep_interval_ms: u64,
    /// Whether stale holders hand their token to a spectator.
    pub reassign_stale: bool,
}

impl SessionSettings {
    /// Level-clear hold as a [`Duration`].
    pub fn clear_hold(&self) -> Duration {
        Duration::from_millis(self.clear_hold_ms)
    }

    /// Level-clear check interval as a [`Duration`].
    pub fn clear_check_interval(&self) -> Duration {
        Duration::from_millis(self.clear_check_interval_ms)
    }

    /// Stale threshold as a [`Duration`].
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    /// Stale sweep interval as a [`Duration`].
    pub fn stale_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.stale_sweep_interval_ms)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            clear_hold_ms: 2000,
            clear_check_interval_ms: 50,
            stale_after_ms: 1000,
            stale_sweep_interval_ms: 1000,
            reassign_stale: true,
        }
    }
}

/// Expression evaluator settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluatorSettings {
    /// Polling period of the evaluator loop.
    pub tick_ms: u64,
    /// Wall-clock limit per evaluation.
    pub timeout_ms: u64,
    /// Interpreter executable.
    pub program: String,
    /// Interpreter arguments.
    pub args: Vec<String>,
    /// Program text fed to the interpreter's stdin; `{expression}` is
    /// replaced by the candidate expression.
    pub template: String,
    /// Prefix shown before the echoed expression.
    pub prompt: String,
    /// Captured output beyond this many bytes is discarded.
    pub max_output_bytes: usize,
}

impl EvaluatorSettings {
    /// Tick period as a [`Duration`].
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Evaluation timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Program text for one expression.
    pub fn render(&self, expression: &str) -> String {
        self.template.replace(EXPRESSION_PLACEHOLDER, expression)
    }
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            timeout_ms: 1000,
            program: "/usr/bin/env".to_string(),
            args: vec!["runhaskell".to_string(), "-XExtendedDefaultRules".to_string()],
            template: "import Control.Monad\nsolution = {expression}\nmain = print solution"
                .to_string(),
            prompt: "λ> ".to_string(),
            max_output_bytes: 64 * 1024,
        }
    }
}
