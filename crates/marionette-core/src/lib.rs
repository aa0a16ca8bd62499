//! Automation orchestration: intent routing, tiered execution, and the
//! strategy library.
//!
//! The pipeline is `IntentRouter` (free text to a tool plus parameters),
//! then `Orchestrator` (tiered execution against an injected platform
//! adapter). The three tiers are a scripted template, a vision-guided
//! plan, and a generic application launch; fallthrough between them is
//! the explicit state machine in [`tiers`].

pub mod fallback;
pub mod orchestrator;
pub mod router;
pub mod script;
pub mod templates;
pub mod tiers;

pub use fallback::{FallbackError, FallbackOutcome, GenericFallback};
pub use orchestrator::{
    AutomationRequest, AutomationResult, EngineError, Orchestrator, OrchestratorConfig,
    TierAttempt, TierCounterSnapshot, UiAutomation,
};
pub use router::{Classification, IntentRouter, RouterConfig, ToolDescriptor};
pub use script::{ScriptKind, ScriptOutput, ScriptRunner, ShellRunner, SUCCESS_MARKER};
pub use templates::{RenderedScript, TemplateLibrary};
pub use tiers::{Tier, TierOutcome, TierState};

/// Errors from any stage of the orchestration pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Engine(#[from] orchestrator::EngineError),

    #[error(transparent)]
    Script(#[from] script::ScriptError),

    #[error(transparent)]
    Fallback(#[from] fallback::FallbackError),

    #[error(transparent)]
    Platform(#[from] marionette_platform::PlatformError),
}
