//! Vision-guided automation for marionette.
//!
//! When no pre-authored script exists for a task, this crate earns its
//! keep: capture the screen, ask a vision model for a short plan of
//! primitive input steps, then replay those steps against the desktop.
//!
//! The pipeline is three seams, each mockable:
//! - [`ScreenSource`] — where the pixels come from (`xcap` or a mock)
//! - [`PlanBackend`] — the vision model client
//! - the input driver from `marionette-platform`
//!
//! [`PlanExecutor`] wires them together and adds the advisory plan cache.

pub mod backend;
pub mod capture;
pub mod executor;
pub mod plan;

pub use backend::{BackendError, HttpPlanBackend, PlanBackend, API_KEY_ENV};
pub use capture::{create_screen_source, CaptureError, Screenshot, ScreenSource};
pub use executor::{ExecError, ExecutionReport, ExecutorConfig, PlanExecutor};
pub use plan::{parse_steps, ActionPlan, PlanError, PlanStep};

use thiserror::Error;

/// Aggregated error for the vision tier.
#[derive(Error, Debug)]
pub enum VisionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
