//! Tier 3: the generic launch chain.
//!
//! When neither a scripted template nor a guided plan got the job done,
//! the last resort is simply getting the target application open. Three
//! attempts, in order of decreasing platform awareness:
//!
//!   1. the platform adapter's native `open_app`
//!   2. the generic launch script, if the platform library carries one
//!   3. spawning the app name directly as a detached process
//!
//! The first attempt that works ends the chain. Permission errors from
//! the adapter are not swallowed; the caller decides how to surface
//! them.

use std::process::Stdio;
use std::sync::Arc;

use marionette_platform::{PlatformAdapter, PlatformError};

use crate::script::{ScriptError, ScriptRunner};
use crate::templates::TemplateLibrary;

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error(transparent)]
    Permission(#[from] PlatformError),
    #[error("all launch attempts failed for {app:?}: {detail}")]
    Exhausted { app: String, detail: String },
}

/// How the fallback eventually got the app open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub method: &'static str,
    pub app: String,
}

pub struct GenericFallback<R> {
    adapter: Arc<dyn PlatformAdapter>,
    library: TemplateLibrary,
    runner: R,
}

impl<R: ScriptRunner> GenericFallback<R> {
    pub fn new(adapter: Arc<dyn PlatformAdapter>, runner: R) -> Self {
        let library = TemplateLibrary::for_platform(adapter.platform());
        Self {
            adapter,
            library,
            runner,
        }
    }

    /// Walk the launch chain for `app`.
    pub async fn launch(&self, app: &str) -> Result<FallbackOutcome, FallbackError> {
        let mut detail = String::new();

        match self.adapter.open_app(app).await {
            Ok(()) => {
                tracing::info!(app, "fallback launched via adapter");
                return Ok(FallbackOutcome {
                    method: "adapter_open_app",
                    app: app.to_string(),
                });
            }
            Err(err) if err.is_recoverable() => return Err(FallbackError::Permission(err)),
            Err(err) => {
                tracing::debug!(app, error = %err, "adapter open_app failed");
                detail.push_str(&format!("adapter: {err}"));
            }
        }

        if let Some(script) = self.library.launch_script(app) {
            match self.runner.run(script.kind, &script.text).await {
                Ok(output) if output.succeeded() => {
                    tracing::info!(app, "fallback launched via script");
                    return Ok(FallbackOutcome {
                        method: "launch_script",
                        app: app.to_string(),
                    });
                }
                Ok(output) => {
                    tracing::debug!(app, stderr = %output.stderr, "launch script failed");
                    detail.push_str(&format!("; script: {}", output.stderr.trim()));
                }
                Err(ScriptError::Timeout(limit)) => {
                    detail.push_str(&format!("; script: timed out after {limit:?}"));
                }
                Err(err) => {
                    detail.push_str(&format!("; script: {err}"));
                }
            }
        }

        match spawn_detached(app) {
            Ok(()) => {
                tracing::info!(app, "fallback launched via process spawn");
                Ok(FallbackOutcome {
                    method: "process_spawn",
                    app: app.to_string(),
                })
            }
            Err(err) => {
                detail.push_str(&format!("; spawn: {err}"));
                Err(FallbackError::Exhausted {
                    app: app.to_string(),
                    detail,
                })
            }
        }
    }
}

/// Spawn `app` as its own process without waiting on it.
fn spawn_detached(app: &str) -> std::io::Result<()> {
    tokio::process::Command::new(app)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
}
