//! Script execution for the scripted tier.
//!
//! Success has two requirements: exit status zero AND the literal
//! `SUCCESS` marker in stdout. Automation scripts routinely exit zero
//! after doing nothing (an app that was not installed, a window that
//! never appeared), so the exit status alone proves very little.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// How the orchestration engine classifies a run.
pub const SUCCESS_MARKER: &str = "SUCCESS";

/// Default wall-clock budget for one scripted attempt.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Which interpreter a script body expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// bash via `bash -c`
    Shell,
    /// AppleScript via `osascript -e`
    AppleScript,
}

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("script timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to run interpreter: {0}")]
    Io(#[from] std::io::Error),
}

/// Captured output of a completed script.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub status_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    /// The tier-1 success contract: clean exit and explicit marker.
    pub fn succeeded(&self) -> bool {
        self.status_ok && self.stdout.contains(SUCCESS_MARKER)
    }
}

/// Runs scripts. Mocked in orchestration tests.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, kind: ScriptKind, script: &str) -> Result<ScriptOutput, ScriptError>;
}

// The orchestration engine and the generic fallback share one runner.
#[async_trait]
impl<T: ScriptRunner + ?Sized> ScriptRunner for std::sync::Arc<T> {
    async fn run(&self, kind: ScriptKind, script: &str) -> Result<ScriptOutput, ScriptError> {
        (**self).run(kind, script).await
    }
}

/// Real runner: spawns the interpreter with a hard timeout. The spawned
/// process group is not cancelled once started; a timeout just stops us
/// waiting for it.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptRunner for ShellRunner {
    async fn run(&self, kind: ScriptKind, script: &str) -> Result<ScriptOutput, ScriptError> {
        let mut command = match kind {
            ScriptKind::Shell => {
                let mut c = tokio::process::Command::new("bash");
                c.arg("-c").arg(script);
                c
            }
            ScriptKind::AppleScript => {
                let mut c = tokio::process::Command::new("osascript");
                c.arg("-e").arg(script);
                c
            }
        };

        tracing::debug!(?kind, timeout = ?self.timeout, "running automation script");
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ScriptError::Timeout(self.timeout))??;

        Ok(ScriptOutput {
            status_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Mock runner for tests: replays canned outputs and records every
/// script it was handed.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct MockRunner {
        outputs: Mutex<Vec<Result<ScriptOutput, ScriptError>>>,
        scripts: Mutex<Vec<(ScriptKind, String)>>,
    }

    impl MockRunner {
        /// Every run reports the marker and a clean exit.
        pub fn succeeding() -> Self {
            Self::with_outputs(vec![])
        }

        /// Runs consume `outputs` front to back; once exhausted, runs
        /// succeed.
        pub fn with_outputs(outputs: Vec<Result<ScriptOutput, ScriptError>>) -> Self {
            Self {
                outputs: Mutex::new(outputs),
                scripts: Mutex::new(Vec::new()),
            }
        }

        /// A run that exits cleanly but never prints the marker.
        pub fn silent_output() -> Result<ScriptOutput, ScriptError> {
            Ok(ScriptOutput {
                status_ok: true,
                stdout: String::new(),
                stderr: String::new(),
            })
        }

        pub fn marker_output() -> Result<ScriptOutput, ScriptError> {
            Ok(ScriptOutput {
                status_ok: true,
                stdout: format!("{SUCCESS_MARKER}\n"),
                stderr: String::new(),
            })
        }

        pub fn scripts(&self) -> Vec<(ScriptKind, String)> {
            self.scripts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScriptRunner for MockRunner {
        async fn run(&self, kind: ScriptKind, script: &str) -> Result<ScriptOutput, ScriptError> {
            self.scripts.lock().unwrap().push((kind, script.to_string()));
            let mut outputs = self.outputs.lock().unwrap();
            if outputs.is_empty() {
                Self::marker_output()
            } else {
                outputs.remove(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_marker_and_clean_exit() {
        let both = ScriptOutput {
            status_ok: true,
            stdout: "did things\nSUCCESS\n".into(),
            stderr: String::new(),
        };
        assert!(both.succeeded());

        let marker_only = ScriptOutput {
            status_ok: false,
            stdout: "SUCCESS".into(),
            stderr: String::new(),
        };
        assert!(!marker_only.succeeded());

        let exit_only = ScriptOutput {
            status_ok: true,
            stdout: "done".into(),
            stderr: String::new(),
        };
        assert!(!exit_only.succeeded());
    }

    #[tokio::test]
    async fn shell_runner_captures_stdout() {
        let runner = ShellRunner::new();
        let output = runner
            .run(ScriptKind::Shell, "echo SUCCESS")
            .await
            .unwrap();
        assert!(output.succeeded());
    }

    #[tokio::test]
    async fn shell_runner_reports_nonzero_exit() {
        let runner = ShellRunner::new();
        let output = runner
            .run(ScriptKind::Shell, "echo SUCCESS; exit 3")
            .await
            .unwrap();
        assert!(!output.status_ok);
        assert!(!output.succeeded());
    }

    #[tokio::test]
    async fn shell_runner_times_out() {
        let runner = ShellRunner::with_timeout(Duration::from_millis(50));
        let err = runner
            .run(ScriptKind::Shell, "sleep 5; echo SUCCESS")
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::Timeout(_)));
    }
}
