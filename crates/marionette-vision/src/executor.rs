//! Plan execution: replay a model's steps against the desktop.
//!
//! Getting a plan at all (capture, backend call, parse) is load-bearing
//! and any failure there fails the tier. Replaying the plan is not:
//! each step failure is logged and skipped, and the run keeps going
//! with the next step, so a missed click on a secondary element does
//! not throw away the work already done.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;

use marionette_platform::input::{InputDriver, KeyCombo, MouseButton};
use marionette_platform::InputError;

use crate::backend::{BackendError, PlanBackend};
use crate::capture::{CaptureError, ScreenSource};
use crate::plan::PlanStep;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Tuning knobs for plan execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Pause between steps so the UI can settle.
    pub settle_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(200),
        }
    }
}

/// Outcome of a completed plan run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub actions_executed: usize,
    pub total_steps: usize,
    pub skipped: usize,
    pub from_cache: bool,
}

/// Advisory cache of previously planned step lists, keyed by
/// (app, task description). Saves a backend round trip for repeated
/// requests; step skips during replay do not invalidate an entry.
#[derive(Debug, Default)]
struct PlanCache {
    plans: RwLock<HashMap<(String, String), Vec<PlanStep>>>,
}

impl PlanCache {
    async fn get(&self, app: &str, task: &str) -> Option<Vec<PlanStep>> {
        self.plans
            .read()
            .await
            .get(&(app.to_string(), task.to_string()))
            .cloned()
    }

    async fn insert(&self, app: &str, task: &str, steps: Vec<PlanStep>) {
        self.plans
            .write()
            .await
            .insert((app.to_string(), task.to_string()), steps);
    }

}

/// Drives the capture → plan → replay pipeline.
pub struct PlanExecutor<S, B, I> {
    screen: S,
    backend: B,
    input: I,
    config: ExecutorConfig,
    cache: PlanCache,
}

impl<S, B, I> PlanExecutor<S, B, I>
where
    S: ScreenSource,
    B: PlanBackend,
    I: InputDriver,
{
    pub fn new(screen: S, backend: B, input: I) -> Self {
        Self {
            screen,
            backend,
            input,
            config: ExecutorConfig::default(),
            cache: PlanCache::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Plan and execute `task` inside `app`.
    pub async fn execute(&self, app: &str, task: &str) -> Result<ExecutionReport, ExecError> {
        let (steps, from_cache) = match self.cache.get(app, task).await {
            Some(steps) => {
                tracing::debug!(app, task, "reusing cached plan");
                (steps, true)
            }
            None => {
                let screenshot = self.screen.capture_primary().await?;
                let plan = self.backend.plan(app, task, &screenshot).await?;
                self.cache.insert(app, task, plan.steps.clone()).await;
                (plan.steps, false)
            }
        };

        let total_steps = steps.len();
        let mut actions_executed = 0;
        let mut skipped = 0;

        for (index, step) in steps.iter().enumerate() {
            let step_number = index + 1;
            tracing::debug!(step = step_number, kind = step.kind(), "executing step");

            match self.run_step(step).await {
                Ok(()) => actions_executed += 1,
                Err(source) => {
                    tracing::warn!(
                        step = step_number,
                        kind = step.kind(),
                        error = %source,
                        "step failed, skipping"
                    );
                    skipped += 1;
                }
            }

            if step_number < total_steps {
                tokio::time::sleep(self.config.settle_delay).await;
            }
        }

        Ok(ExecutionReport {
            actions_executed,
            total_steps,
            skipped,
            from_cache,
        })
    }

    async fn run_step(&self, step: &PlanStep) -> Result<(), InputError> {
        match step {
            PlanStep::Click { x, y } => self.input.click(*x, *y, MouseButton::Left).await,
            PlanStep::Type { text } => self.input.type_text(text).await,
            PlanStep::Key { combo } => {
                let parsed = KeyCombo::parse(combo)?;
                self.input.press_key(&parsed).await
            }
            PlanStep::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            PlanStep::Scroll { dx, dy } => self.input.scroll(*dx, *dy).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::capture::mock::MockSource;
    use marionette_platform::input::mock::{MockDriver, RecordedInput};

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            settle_delay: Duration::ZERO,
        }
    }

    fn sample_steps() -> Vec<PlanStep> {
        vec![
            PlanStep::Key {
                combo: "Ctrl+F".into(),
            },
            PlanStep::Type {
                text: "jazz".into(),
            },
            PlanStep::Key {
                combo: "Return".into(),
            },
            PlanStep::Click { x: 400, y: 300 },
        ]
    }

    #[tokio::test]
    async fn executes_all_steps() {
        let executor = PlanExecutor::new(
            MockSource::new(),
            MockBackend::with_steps(sample_steps()),
            MockDriver::new(),
        )
        .with_config(fast_config());

        let report = executor.execute("spotify", "play jazz").await.unwrap();
        assert_eq!(report.actions_executed, 4);
        assert_eq!(report.total_steps, 4);
        assert_eq!(report.skipped, 0);
        assert!(!report.from_cache);
    }

    #[tokio::test]
    async fn second_run_uses_cache() {
        let executor = PlanExecutor::new(
            MockSource::new(),
            MockBackend::with_steps(sample_steps()),
            MockDriver::new(),
        )
        .with_config(fast_config());

        executor.execute("spotify", "play jazz").await.unwrap();
        let report = executor.execute("spotify", "play jazz").await.unwrap();
        assert!(report.from_cache);
        assert_eq!(executor.backend.calls(), 1);
    }

    #[tokio::test]
    async fn step_failures_are_skipped_not_fatal() {
        // The driver dies after step 1 of 4; the run still completes.
        let executor = PlanExecutor::new(
            MockSource::new(),
            MockBackend::with_steps(sample_steps()),
            MockDriver::failing_after(1),
        )
        .with_config(fast_config());

        let report = executor.execute("spotify", "play jazz").await.unwrap();
        assert_eq!(report.actions_executed, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.total_steps, 4);
    }

    #[tokio::test]
    async fn late_failures_are_skipped() {
        let mut steps = sample_steps();
        steps.push(PlanStep::Click { x: 1, y: 1 });
        let executor = PlanExecutor::new(
            MockSource::new(),
            MockBackend::with_steps(steps),
            MockDriver::failing_after(3),
        )
        .with_config(fast_config());

        let report = executor.execute("spotify", "play jazz").await.unwrap();
        assert_eq!(report.actions_executed, 3);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn wait_steps_do_not_touch_the_driver() {
        let steps = vec![
            PlanStep::Click { x: 5, y: 5 },
            PlanStep::Wait { ms: 1 },
            PlanStep::Click { x: 6, y: 6 },
        ];
        let executor = PlanExecutor::new(
            MockSource::new(),
            MockBackend::with_steps(steps),
            MockDriver::new(),
        )
        .with_config(fast_config());

        executor.execute("notes", "wait around").await.unwrap();
        let recorded = executor.input.recorded();
        assert_eq!(
            recorded
                .iter()
                .filter(|r| matches!(r, RecordedInput::Click { .. }))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let executor = PlanExecutor::new(MockSource::new(), MockBackend::failing(), MockDriver::new())
            .with_config(fast_config());
        assert!(matches!(
            executor.execute("spotify", "play jazz").await,
            Err(ExecError::Backend(_))
        ));
    }
}
