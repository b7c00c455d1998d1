//! Process-wide task supervision and shutdown.
//!
//! The session actor, the evaluator, and the HTTP listener all watch one
//! `CancellationToken`. The coordinator owns their join handles, waits for
//! Ctrl-C (or an explicit cancel), then gives the tasks a shared grace
//! period and aborts whatever is still running.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Grace period used by [`ShutdownCoordinator::default`].
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// How each tracked task ended.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks that returned within the grace period.
    pub finished: Vec<&'static str>,
    /// Tasks that panicked or were cancelled elsewhere.
    pub failed: Vec<&'static str>,
    /// Tasks still running at the deadline; they have been aborted.
    pub aborted: Vec<&'static str>,
}

impl ShutdownReport {
    /// Whether every task stopped on its own.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_empty()
    }
}

/// Owns the long-lived tasks of a running server.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    grace: Duration,
}

impl ShutdownCoordinator {
    /// Coordinator that allows `grace` for tasks to stop.
    pub fn new(grace: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            grace,
        }
    }

    /// Token every supervised task should stop on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Supervise `handle` under `name`.
    pub fn track(&self, name: &'static str, handle: JoinHandle<()>) {
        self.tasks.lock().push((name, handle));
    }

    /// Number of tasks currently supervised.
    pub fn tracked(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Signal every task to stop without waiting.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for `signal` or an explicit [`cancel`](Self::cancel), then drain.
    pub async fn run_until<F>(&self, signal: F) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            () = signal => info!("shutdown signal received"),
            () = self.token.cancelled() => info!("shutdown requested"),
        }
        self.drain().await
    }

    /// [`run_until`](Self::run_until) Ctrl-C.
    pub async fn run_until_ctrl_c(&self) -> ShutdownReport {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl-C, waiting for cancellation");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Cancel the token and wait out the grace period for tracked tasks.
    pub async fn drain(&self) -> ShutdownReport {
        self.token.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        info!(
            tasks = tasks.len(),
            grace_ms = self.grace.as_millis() as u64,
            "stopping tasks"
        );

        let deadline = Instant::now() + self.grace;
        let mut report = ShutdownReport::default();
        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => report.finished.push(name),
                Ok(Err(e)) => {
                    warn!(task = name, error = %e, "task failed during shutdown");
                    report.failed.push(name);
                }
                Err(_) => {
                    handle.abort();
                    warn!(task = name, "task still running after grace period, aborted");
                    report.aborted.push(name);
                }
            }
        }
        report
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waits_for(token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { token.cancelled().await })
    }

    #[tokio::test]
    async fn drain_reports_cooperative_tasks() {
        let coord = ShutdownCoordinator::new(Duration::from_secs(1));
        coord.track("session", waits_for(coord.token()));
        coord.track("evaluator", waits_for(coord.token()));
        assert_eq!(coord.tracked(), 2);

        let report = coord.drain().await;
        assert_eq!(report.finished, vec!["session", "evaluator"]);
        assert!(report.is_clean());
        assert_eq!(coord.tracked(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_task_is_aborted_at_deadline() {
        let coord = ShutdownCoordinator::new(Duration::from_millis(50));
        coord.track("session", waits_for(coord.token()));
        coord.track(
            "http",
            tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }),
        );

        let report = coord.drain().await;
        assert_eq!(report.finished, vec!["session"]);
        assert_eq!(report.aborted, vec!["http"]);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn panicked_task_is_reported_failed() {
        let coord = ShutdownCoordinator::new(Duration::from_secs(1));
        coord.track("evaluator", tokio::spawn(async { panic!("boom") }));
        let report = coord.drain().await;
        assert_eq!(report.failed, vec!["evaluator"]);
    }

    #[tokio::test]
    async fn run_until_returns_after_signal() {
        let coord = ShutdownCoordinator::new(Duration::from_secs(1));
        let token = coord.token();
        coord.track("session", waits_for(coord.token()));
        let report = coord.run_until(async {}).await;
        assert!(token.is_cancelled());
        assert_eq!(report.finished, vec!["session"]);
    }

    #[tokio::test]
    async fn explicit_cancel_ends_run() {
        let coord = std::sync::Arc::new(ShutdownCoordinator::new(Duration::from_secs(1)));
        coord.track("session", waits_for(coord.token()));
        let canceller = std::sync::Arc::clone(&coord);
        let _ = tokio::spawn(async move { canceller.cancel() });
        let report = coord.run_until(std::future::pending()).await;
        assert!(report.is_clean());
    }
}
