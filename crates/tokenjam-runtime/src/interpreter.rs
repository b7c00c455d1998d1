//! External interpreter invocation.
//!
//! The session treats evaluation as a text-in, text-out oracle with a hard
//! timeout. Every invocation produces displayable text: failures, non-zero
//! exits, and timeouts are folded into the output rather than reported as
//! errors.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokenjam_settings::EvaluatorSettings;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Evaluates an expression and returns its combined output.
#[async_trait]
pub trait Interpreter: Send + Sync {
    /// Evaluate `expression`, giving up after `timeout`.
    async fn evaluate(&self, expression: &str, timeout: Duration) -> String;
}

/// Interpreter backed by a fresh child process per evaluation.
///
/// The expression is substituted into a program template which is written
/// to the child's stdin; stdout and stderr are captured together.
#[derive(Clone, Debug)]
pub struct ProcessInterpreter {
    settings: EvaluatorSettings,
}

impl ProcessInterpreter {
    /// Build from evaluator settings.
    pub fn from_settings(settings: &EvaluatorSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }
}

type SharedBuf = Arc<Mutex<Vec<u8>>>;

#[async_trait]
impl Interpreter for ProcessInterpreter {
    async fn evaluate(&self, expression: &str, timeout: Duration) -> String {
        let source = self.settings.render(expression);
        let limit = self.settings.max_output_bytes;

        let mut cmd = Command::new(&self.settings.program);
        let _ = cmd
            .args(&self.settings.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.settings.program, expression, "spawning interpreter");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %self.settings.program, error = %e, "failed to start interpreter");
                return format!("(failed to start interpreter: {e})");
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            let _ = tokio::spawn(async move {
                // The child may exit without reading; a broken pipe is fine.
                let _ = stdin.write_all(source.as_bytes()).await;
            });
        }

        // Both streams append to one buffer so partial output survives a kill.
        let output: SharedBuf = Arc::new(Mutex::new(Vec::new()));
        let mut drains: Vec<JoinHandle<()>> = [
            child
                .stdout
                .take()
                .map(|pipe| tokio::spawn(drain(pipe, Arc::clone(&output), limit))),
            child
                .stderr
                .take()
                .map(|pipe| tokio::spawn(drain(pipe, Arc::clone(&output), limit))),
        ]
        .into_iter()
        .flatten()
        .collect();

        // One deadline covers the exit and the drain: grandchildren that
        // inherited the pipes must not extend the evaluation.
        let deadline = Instant::now() + timeout;
        let finished = tokio::time::timeout_at(deadline, async {
            let status = child.wait().await;
            for h in &mut drains {
                let _ = h.await;
            }
            status
        })
        .await;

        let trailer = match finished {
            Ok(Ok(status)) if status.success() => None,
            Ok(Ok(status)) => Some(match status.code() {
                Some(code) => format!("(exit status: {code})"),
                None => "(interpreter terminated by signal)".to_string(),
            }),
            Ok(Err(e)) => Some(format!("(interpreter wait failed: {e})")),
            Err(_) => {
                let _ = child.kill().await;
                for h in &drains {
                    h.abort();
                }
                debug!(expression, timeout_ms = timeout.as_millis() as u64, "interpreter timed out");
                Some(format!("(timed out after {timeout:?})"))
            }
        };

        let bytes = std::mem::take(&mut *output.lock());
        render_output(&bytes, limit, trailer.as_deref())
    }
}

async fn drain<R>(mut pipe: R, sink: SharedBuf, limit: usize)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut buf = sink.lock();
                // One byte past the limit marks the output as truncated.
                let room = (limit + 1).saturating_sub(buf.len());
                buf.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
}

fn render_output(bytes: &[u8], limit: usize, trailer: Option<&str>) -> String {
    let truncated = bytes.len() > limit;
    let mut text = String::from_utf8_lossy(&bytes[..bytes.len().min(limit)]).into_owned();
    if truncated {
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str("(output truncated)");
    }
    if let Some(trailer) = trailer {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(trailer);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(template: &str) -> ProcessInterpreter {
        ProcessInterpreter::from_settings(&EvaluatorSettings {
            program: "sh".into(),
            args: vec![],
            template: template.into(),
            ..EvaluatorSettings::default()
        })
    }

    const LONG: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn captures_stdout() {
        let out = shell("echo {expression}").evaluate("hello", LONG).await;
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn captures_stderr() {
        let out = shell("echo {expression} >&2").evaluate("oops", LONG).await;
        assert_eq!(out, "oops\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_annotated() {
        let out = shell("echo bad; exit {expression}").evaluate("3", LONG).await;
        assert_eq!(out, "bad\n(exit status: 3)");
    }

    #[tokio::test]
    async fn timeout_keeps_partial_output() {
        let out = shell("echo partial; sleep {expression}")
            .evaluate("5", Duration::from_millis(300))
            .await;
        assert!(out.starts_with("partial\n"), "{out}");
        assert!(out.ends_with("(timed out after 300ms)"), "{out}");
    }

    #[tokio::test]
    async fn timeout_covers_backgrounded_children() {
        let started = std::time::Instant::now();
        let out = shell("echo hi; sleep {expression} &")
            .evaluate("4", Duration::from_millis(300))
            .await;
        let took = started.elapsed();
        assert!(took < Duration::from_secs(2), "took {took:?}");
        assert!(out.starts_with("hi\n"), "{out}");
        assert!(out.ends_with("(timed out after 300ms)"), "{out}");
    }

    #[tokio::test]
    async fn spawn_failure_is_text() {
        let interp = ProcessInterpreter::from_settings(&EvaluatorSettings {
            program: "/nonexistent/interpreter".into(),
            ..EvaluatorSettings::default()
        });
        let out = interp.evaluate("1", LONG).await;
        assert!(out.starts_with("(failed to start interpreter:"), "{out}");
    }

    #[tokio::test]
    async fn output_is_truncated() {
        let interp = ProcessInterpreter::from_settings(&EvaluatorSettings {
            program: "sh".into(),
            args: vec![],
            template: "printf '%0{expression}d' 0".into(),
            max_output_bytes: 10,
            ..EvaluatorSettings::default()
        });
        let out = interp.evaluate("100", LONG).await;
        assert_eq!(out, "0000000000\n(output truncated)");
    }

    #[test]
    fn render_appends_trailer_on_new_line() {
        assert_eq!(render_output(b"x", 10, Some("(exit status: 1)")), "x\n(exit status: 1)");
        assert_eq!(render_output(b"", 10, Some("(exit status: 1)")), "(exit status: 1)");
        assert_eq!(render_output(b"ok\n", 10, None), "ok\n");
    }
}
