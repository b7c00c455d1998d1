//! Throttled background evaluation of the current arrangement.
//!
//! The actor publishes the latest candidate into a `watch` channel; the
//! evaluator samples it on a fixed tick, so candidates superseded between
//! ticks are never evaluated. A candidate identical to the last one
//! evaluated, same expression within the same puzzle load, is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::interpreter::Interpreter;
use crate::session::SessionEvent;

/// Expression to evaluate, tagged with the puzzle load it was built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Candidate {
    /// Bumped on every puzzle load, including revisits.
    pub generation: u64,
    /// Puzzle the expression belongs to.
    pub puzzle_id: usize,
    /// Rendered expression.
    pub expression: String,
}

/// Evaluator loop parameters.
pub(crate) struct Evaluator {
    pub(crate) interpreter: Arc<dyn Interpreter>,
    pub(crate) tick: Duration,
    pub(crate) timeout: Duration,
    pub(crate) prompt: String,
}

impl Evaluator {
    /// Run until cancelled or until the actor stops accepting results.
    pub(crate) fn spawn(
        self,
        mut candidates: watch::Receiver<Candidate>,
        results: mpsc::Sender<SessionEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last: Option<Candidate> = None;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let candidate = candidates.borrow_and_update().clone();
                if candidate.expression.is_empty() || last.as_ref() == Some(&candidate) {
                    continue;
                }

                debug!(
                    generation = candidate.generation,
                    puzzle_id = candidate.puzzle_id,
                    expression = %candidate.expression,
                    "evaluating"
                );
                let output = tokio::select! {
                    () = cancel.cancelled() => break,
                    out = self.interpreter.evaluate(&candidate.expression, self.timeout) => out,
                };
                let event = SessionEvent::EvalResult {
                    generation: candidate.generation,
                    output: format!("{}{}\n{output}", self.prompt, candidate.expression),
                };
                last = Some(candidate);
                if results.send(event).await.is_err() {
                    break;
                }
            }
            debug!("evaluator stopped");
        })
    }
}
