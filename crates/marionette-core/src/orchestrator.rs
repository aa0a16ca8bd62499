//! The automation orchestration engine.
//!
//! Execution walks the tier state machine in [`crate::tiers`]: pick the
//! cheapest applicable tier, attempt it once, and on failure fall
//! through to the next. Before any tier runs, the platform adapter gets
//! one chance to handle the request natively (Spotify URIs beat UI
//! scripting every time); `Unsupported` from the adapter just means
//! "carry on".
//!
//! Every failure mode except one is absorbed into the result. The
//! exception is a missing system permission: no amount of falling
//! through fixes that, so it surfaces as an error for the caller to put
//! in front of the user.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use marionette_platform::{PlatformAdapter, PlatformError};
use marionette_vision::capture::CaptureError;
use marionette_vision::executor::{ExecError, ExecutionReport, PlanExecutor};
use marionette_vision::{PlanBackend, ScreenSource};
use marionette_platform::input::InputDriver;

use crate::fallback::{FallbackError, GenericFallback};
use crate::script::{ScriptError, ScriptRunner};
use crate::templates::TemplateLibrary;
use crate::tiers::{next, Tier, TierOutcome, TierState};

#[derive(Debug, Error)]
pub enum EngineError {
    /// A system permission is missing. Not retryable by another tier.
    #[error(transparent)]
    Permission(PlatformError),
}

/// One automation request, already classified and parameterized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationRequest {
    /// Normalized action verb ("play", "message", "open_url", "open").
    pub action: String,
    /// Normalized target application ("spotify", "whatsapp").
    pub app: String,
    pub params: HashMap<String, String>,
}

impl AutomationRequest {
    pub fn new(
        action: impl Into<String>,
        app: impl Into<String>,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            action: action.into().to_lowercase(),
            app: normalize_app_name(&app.into()),
            params,
        }
    }

    /// Build a request from a router classification. Unrouted tools map
    /// to an app launch of whatever app the parameters name.
    pub fn from_intent(tool: &str, params: HashMap<String, String>) -> Self {
        // The url extractor reports "default" when no browser was named;
        // that is not an app, so the per-tool fallback applies instead.
        let app_param = |keys: &[&str], default: &str| {
            keys.iter()
                .filter_map(|k| params.get(*k))
                .find(|v| !v.is_empty() && v.as_str() != "default")
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };
        let (action, app) = match tool {
            "playMusic" => ("play", app_param(&["app"], "spotify")),
            "pauseMedia" => ("pause", app_param(&["app"], "spotify")),
            "nextTrack" => ("next", app_param(&["app"], "spotify")),
            "messageContact" => ("message", app_param(&["app"], "whatsapp")),
            "openUrl" => ("open_url", app_param(&["browser"], "chrome")),
            "openFile" => ("open_file", app_param(&["app"], "vscode")),
            "createNote" => ("create_note", app_param(&["app"], "notes")),
            "openApp" => ("open", app_param(&["appName"], "")),
            other => ("open", app_param(&["appName", "app"], other)),
        };
        Self::new(action, app, params)
    }
}

/// What one tier attempt did and why.
#[derive(Debug, Clone, Serialize)]
pub struct TierAttempt {
    pub tier: Tier,
    pub succeeded: bool,
    pub detail: String,
}

/// Final outcome of one orchestrated request.
#[derive(Debug, Clone, Serialize)]
pub struct AutomationResult {
    pub success: bool,
    /// The tier that answered: the one that succeeded, or the last one
    /// attempted when all failed. A native adapter success counts as
    /// the scripted tier, which it stands in for.
    pub tier: Tier,
    /// How the request was ultimately carried out.
    pub method: String,
    pub attempts: Vec<TierAttempt>,
    /// Wall-clock time across the whole attempt chain.
    pub elapsed_ms: u64,
}

/// Engine policy knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Actions worth driving through the vision-guided tier. Anything
    /// else skips straight from scripts to the generic launch.
    pub ui_actions: HashSet<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let ui_actions = [
            "play", "search", "message", "call", "create", "edit", "send", "type",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        Self { ui_actions }
    }
}

/// Seam for the vision-guided tier, so orchestration tests don't need a
/// screen or a model behind them.
#[async_trait]
pub trait UiAutomation: Send + Sync {
    async fn run_task(&self, app: &str, task: &str) -> Result<ExecutionReport, ExecError>;
}

#[async_trait]
impl<S, B, I> UiAutomation for PlanExecutor<S, B, I>
where
    S: ScreenSource,
    B: PlanBackend,
    I: InputDriver,
{
    async fn run_task(&self, app: &str, task: &str) -> Result<ExecutionReport, ExecError> {
        self.execute(app, task).await
    }
}

/// Placeholder UI tier for engines built without one.
pub struct NoUi;

#[async_trait]
impl UiAutomation for NoUi {
    async fn run_task(&self, _app: &str, _task: &str) -> Result<ExecutionReport, ExecError> {
        Err(ExecError::Capture(CaptureError::NotAvailable))
    }
}

/// Per-tier attempt and success tallies.
#[derive(Debug, Default)]
pub struct TierCounters {
    native_successes: AtomicU64,
    attempts: [AtomicU64; 3],
    successes: [AtomicU64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierCounterSnapshot {
    pub native_successes: u64,
    pub attempts: [u64; 3],
    pub successes: [u64; 3],
}

impl TierCounters {
    fn record(&self, tier: Tier, outcome: TierOutcome) {
        let idx = (tier.number() - 1) as usize;
        self.attempts[idx].fetch_add(1, Ordering::Relaxed);
        if outcome == TierOutcome::Success {
            self.successes[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> TierCounterSnapshot {
        let load = |a: &AtomicU64| a.load(Ordering::Relaxed);
        TierCounterSnapshot {
            native_successes: load(&self.native_successes),
            attempts: [0, 1, 2].map(|i| load(&self.attempts[i])),
            successes: [0, 1, 2].map(|i| load(&self.successes[i])),
        }
    }
}

/// The engine: adapter + template library + script runner, with an
/// optional vision-guided tier.
pub struct Orchestrator<R, U = NoUi> {
    adapter: Arc<dyn PlatformAdapter>,
    library: TemplateLibrary,
    runner: Arc<R>,
    fallback: GenericFallback<Arc<R>>,
    ui: Option<U>,
    config: OrchestratorConfig,
    counters: TierCounters,
}

impl<R: ScriptRunner> Orchestrator<R, NoUi> {
    /// An engine without the vision-guided tier; plan-suited requests
    /// fall straight through to the generic launch.
    pub fn new(adapter: Arc<dyn PlatformAdapter>, runner: R) -> Self {
        let runner = Arc::new(runner);
        let library = TemplateLibrary::for_platform(adapter.platform());
        let fallback = GenericFallback::new(Arc::clone(&adapter), Arc::clone(&runner));
        Self {
            adapter,
            library,
            runner,
            fallback,
            ui: None,
            config: OrchestratorConfig::default(),
            counters: TierCounters::default(),
        }
    }
}

impl<R: ScriptRunner, U: UiAutomation> Orchestrator<R, U> {
    /// Attach the vision-guided tier.
    pub fn with_ui<U2: UiAutomation>(self, ui: U2) -> Orchestrator<R, U2> {
        Orchestrator {
            adapter: self.adapter,
            library: self.library,
            runner: self.runner,
            fallback: self.fallback,
            ui: Some(ui),
            config: self.config,
            counters: self.counters,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn counters(&self) -> TierCounterSnapshot {
        self.counters.snapshot()
    }

    pub fn platform(&self) -> marionette_platform::Platform {
        self.adapter.platform()
    }

    pub fn capabilities(&self) -> marionette_platform::CapabilitySet {
        self.adapter.capabilities()
    }

    // Adapter passthroughs for operations with no tiered strategy.

    pub async fn take_screenshot(
        &self,
        path: Option<&std::path::Path>,
    ) -> Result<std::path::PathBuf, PlatformError> {
        self.adapter.take_screenshot(path).await
    }

    pub async fn battery(&self) -> Result<marionette_platform::BatteryStatus, PlatformError> {
        self.adapter.get_battery().await
    }

    pub async fn close_app(&self, app: &str) -> Result<(), PlatformError> {
        self.adapter.close_app(&normalize_app_name(app)).await
    }

    pub async fn check_permissions(
        &self,
    ) -> Result<marionette_platform::PermissionReport, PlatformError> {
        self.adapter.check_permissions().await
    }

    pub async fn request_permissions(
        &self,
    ) -> Result<marionette_platform::PermissionReport, PlatformError> {
        self.adapter.request_permissions().await
    }

    pub async fn installed_apps(&self) -> Result<Vec<String>, PlatformError> {
        self.adapter.list_installed_apps().await
    }

    /// Run one request through the tier walk.
    pub async fn execute(
        &self,
        request: &AutomationRequest,
    ) -> Result<AutomationResult, EngineError> {
        tracing::info!(action = %request.action, app = %request.app, "orchestrating request");
        let started = std::time::Instant::now();
        let elapsed_ms = |started: std::time::Instant| started.elapsed().as_millis() as u64;

        if self.try_native(request).await? {
            return Ok(AutomationResult {
                success: true,
                tier: Tier::Scripted,
                method: "adapter_native".to_string(),
                attempts: vec![TierAttempt {
                    tier: Tier::Scripted,
                    succeeded: true,
                    detail: "adapter handled the request natively".to_string(),
                }],
                elapsed_ms: elapsed_ms(started),
            });
        }

        let mut state = TierState::starting_at(self.starting_tier(request));
        let mut attempts = Vec::new();

        while let Some(tier) = state.tier() {
            let (outcome, detail, method) = match tier {
                Tier::Scripted => self.attempt_scripted(request).await,
                Tier::PlanGuided => self.attempt_plan_guided(request).await,
                Tier::Generic => self.attempt_generic(request).await?,
            };
            self.counters.record(tier, outcome);
            let succeeded = outcome == TierOutcome::Success;
            tracing::info!(%tier, succeeded, detail = %detail, "tier attempt finished");
            attempts.push(TierAttempt {
                tier,
                succeeded,
                detail,
            });
            if succeeded {
                return Ok(AutomationResult {
                    success: true,
                    tier,
                    method,
                    attempts,
                    elapsed_ms: elapsed_ms(started),
                });
            }
            state = next(state, outcome);
        }

        tracing::warn!(action = %request.action, app = %request.app, "all tiers exhausted");
        Ok(AutomationResult {
            success: false,
            tier: attempts.last().map_or(Tier::Generic, |attempt| attempt.tier),
            method: "none".to_string(),
            attempts,
            elapsed_ms: elapsed_ms(started),
        })
    }

    /// Give the adapter first refusal on requests it handles natively.
    /// `true` means the request is done.
    async fn try_native(&self, request: &AutomationRequest) -> Result<bool, EngineError> {
        if request.action != "play" {
            return Ok(false);
        }
        let song = request
            .params
            .get("songInfo")
            .map(String::as_str)
            .unwrap_or_default();
        match self.adapter.play_music(song, &request.app).await {
            Ok(()) => {
                self.counters
                    .native_successes
                    .fetch_add(1, Ordering::Relaxed);
                tracing::info!(app = %request.app, "adapter handled playback natively");
                Ok(true)
            }
            Err(err) if err.is_recoverable() => Err(EngineError::Permission(err)),
            Err(err) if err.is_unsupported() => Ok(false),
            Err(err) => {
                tracing::debug!(error = %err, "native playback failed, walking the tiers");
                Ok(false)
            }
        }
    }

    fn starting_tier(&self, request: &AutomationRequest) -> Tier {
        if self.library.has_template(&request.action, &request.app) {
            Tier::Scripted
        } else if self.ui.is_some() && self.is_ui_action(&request.action) {
            Tier::PlanGuided
        } else {
            Tier::Generic
        }
    }

    /// Compound actions like `create_note` qualify through their verb.
    fn is_ui_action(&self, action: &str) -> bool {
        if self.config.ui_actions.contains(action) {
            return true;
        }
        action
            .split('_')
            .next()
            .map_or(false, |verb| self.config.ui_actions.contains(verb))
    }

    async fn attempt_scripted(
        &self,
        request: &AutomationRequest,
    ) -> (TierOutcome, String, String) {
        let params = template_params(&request.params);
        let Some(rendered) = self
            .library
            .instantiate(&request.action, &request.app, &params)
        else {
            return (
                TierOutcome::Failure,
                format!("no template for ({}, {})", request.action, request.app),
                String::new(),
            );
        };
        if let Some(name) = rendered.first_unresolved_placeholder() {
            return (
                TierOutcome::Failure,
                format!("missing parameter for placeholder '{name}'"),
                String::new(),
            );
        }
        match self.runner.run(rendered.kind, &rendered.text).await {
            Ok(output) if output.succeeded() => (
                TierOutcome::Success,
                "script reported success".to_string(),
                "scripted_template".to_string(),
            ),
            Ok(output) => {
                let detail = if output.status_ok {
                    "script exited cleanly without the success marker".to_string()
                } else {
                    format!("script failed: {}", output.stderr.trim())
                };
                (TierOutcome::Failure, detail, String::new())
            }
            Err(ScriptError::Timeout(limit)) => (
                TierOutcome::Failure,
                format!("script timed out after {limit:?}"),
                String::new(),
            ),
            Err(err) => (TierOutcome::Failure, err.to_string(), String::new()),
        }
    }

    async fn attempt_plan_guided(
        &self,
        request: &AutomationRequest,
    ) -> (TierOutcome, String, String) {
        let Some(ui) = &self.ui else {
            return (
                TierOutcome::Failure,
                "no ui automation configured".to_string(),
                String::new(),
            );
        };
        // Best effort: the plan replays better against a focused window,
        // but a launch failure here is not fatal to the tier.
        if let Err(err) = self.adapter.open_app(&request.app).await {
            tracing::debug!(app = %request.app, error = %err, "could not focus app before planning");
        }
        let task = build_task_description(request);
        match ui.run_task(&request.app, &task).await {
            Ok(report) => (
                TierOutcome::Success,
                format!(
                    "executed {}/{} plan steps ({} skipped)",
                    report.actions_executed, report.total_steps, report.skipped
                ),
                "plan_guided".to_string(),
            ),
            Err(err) => (TierOutcome::Failure, err.to_string(), String::new()),
        }
    }

    async fn attempt_generic(
        &self,
        request: &AutomationRequest,
    ) -> Result<(TierOutcome, String, String), EngineError> {
        if request.app.is_empty() {
            return Ok((
                TierOutcome::Failure,
                "no application to launch".to_string(),
                String::new(),
            ));
        }
        match self.fallback.launch(&request.app).await {
            Ok(outcome) => Ok((
                TierOutcome::Success,
                format!("launched via {}", outcome.method),
                outcome.method.to_string(),
            )),
            Err(FallbackError::Permission(err)) => Err(EngineError::Permission(err)),
            Err(err) => Ok((TierOutcome::Failure, err.to_string(), String::new())),
        }
    }
}

/// Bridge router parameter names onto template slot names. Original
/// keys are kept alongside the aliases.
fn template_params(params: &HashMap<String, String>) -> HashMap<String, String> {
    let mut out = params.clone();
    for (from, to) in [
        ("songInfo", "song"),
        ("contactName", "contact"),
        ("fileName", "file"),
    ] {
        if let Some(value) = params.get(from) {
            out.entry(to.to_string()).or_insert_with(|| value.clone());
        }
    }
    out
}

/// Canonical app keys used by the template library.
pub fn normalize_app_name(raw: &str) -> String {
    let name = raw.trim().to_lowercase();
    match name.as_str() {
        "apple music" | "music" | "itunes" => "apple_music".to_string(),
        "google chrome" => "chrome".to_string(),
        "mozilla firefox" => "firefox".to_string(),
        "vs code" | "visual studio code" | "code" => "vscode".to_string(),
        "whatsapp desktop" => "whatsapp".to_string(),
        "telegram desktop" => "telegram".to_string(),
        _ => name.replace(' ', "_"),
    }
}

/// Natural-language task for the vision planner.
fn build_task_description(request: &AutomationRequest) -> String {
    let get = |key: &str| request.params.get(key).map(String::as_str).unwrap_or("");
    match request.action.as_str() {
        "play" => {
            let song = get("songInfo");
            if song.is_empty() {
                "resume playback".to_string()
            } else {
                format!("search for and play '{song}'")
            }
        }
        "message" => format!(
            "send message to {}: {}",
            get("contactName"),
            get("message")
        ),
        "search" => format!("search for '{}'", get("query")),
        "open_url" => format!("navigate to {}", get("url")),
        "create_note" => format!("create a new note containing: {}", get("content")),
        other => format!("{} in {}", other.replace('_', " "), request.app),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::mock::MockRunner;
    use crate::script::ScriptKind;
    use marionette_platform::{BatteryStatus, PermissionReport, Platform, PlatformResult};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Copy)]
    enum Native {
        Handles,
        Unsupported,
        Denied,
    }

    struct TestAdapter {
        platform: Platform,
        native: Native,
        open_app_ok: bool,
        open_app_denied: bool,
    }

    impl TestAdapter {
        fn new(platform: Platform) -> Self {
            Self {
                platform,
                native: Native::Unsupported,
                open_app_ok: true,
                open_app_denied: false,
            }
        }
    }

    #[async_trait]
    impl PlatformAdapter for TestAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }
        async fn play_music(&self, _song: &str, _app: &str) -> PlatformResult<()> {
            match self.native {
                Native::Handles => Ok(()),
                Native::Unsupported => Err(PlatformError::unsupported("play_music")),
                Native::Denied => Err(PlatformError::permission_denied(
                    "automation",
                    "grant Automation in System Settings",
                )),
            }
        }
        async fn open_file(&self, _path: &Path) -> PlatformResult<()> {
            Ok(())
        }
        async fn take_screenshot(&self, _path: Option<&Path>) -> PlatformResult<PathBuf> {
            Err(PlatformError::unsupported("take_screenshot"))
        }
        async fn open_app(&self, _name: &str) -> PlatformResult<()> {
            if self.open_app_denied {
                Err(PlatformError::permission_denied(
                    "accessibility",
                    "grant Accessibility in System Settings",
                ))
            } else if self.open_app_ok {
                Ok(())
            } else {
                Err(PlatformError::command_failed("open", "no such app"))
            }
        }
        async fn close_app(&self, _name: &str) -> PlatformResult<()> {
            Ok(())
        }
        async fn get_battery(&self) -> PlatformResult<BatteryStatus> {
            Err(PlatformError::unsupported("get_battery"))
        }
        async fn check_permissions(&self) -> PlatformResult<PermissionReport> {
            Ok(PermissionReport::default())
        }
        async fn request_permissions(&self) -> PlatformResult<PermissionReport> {
            Ok(PermissionReport::default())
        }
        async fn list_installed_apps(&self) -> PlatformResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct MockUi {
        succeed: bool,
        calls: AtomicUsize,
    }

    impl MockUi {
        fn succeeding() -> Self {
            Self {
                succeed: true,
                calls: AtomicUsize::new(0),
            }
        }
        fn failing() -> Self {
            Self {
                succeed: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UiAutomation for MockUi {
        async fn run_task(&self, _app: &str, _task: &str) -> Result<ExecutionReport, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(ExecutionReport {
                    actions_executed: 4,
                    total_steps: 4,
                    skipped: 0,
                    from_cache: false,
                })
            } else {
                Err(ExecError::Capture(CaptureError::NotAvailable))
            }
        }
    }

    fn request(action: &str, app: &str, params: &[(&str, &str)]) -> AutomationRequest {
        AutomationRequest::new(
            action,
            app,
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn scripted_tier_succeeds_first() {
        let engine = Orchestrator::new(
            Arc::new(TestAdapter::new(Platform::MacOs)),
            MockRunner::succeeding(),
        );
        let result = engine
            .execute(&request("pause", "spotify", &[]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.tier, Tier::Scripted);
        assert_eq!(result.method, "scripted_template");
        assert_eq!(result.attempts.len(), 1);

        let scripts = engine.runner.scripts();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].0, ScriptKind::AppleScript);
    }

    #[tokio::test]
    async fn silent_script_falls_through_to_plan_tier() {
        let engine = Orchestrator::new(
            Arc::new(TestAdapter::new(Platform::MacOs)),
            MockRunner::with_outputs(vec![MockRunner::silent_output()]),
        )
        .with_ui(MockUi::succeeding());
        let result = engine
            .execute(&request("play", "spotify", &[("songInfo", "take five")]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.tier, Tier::PlanGuided);
        assert_eq!(result.attempts.len(), 2);
        assert!(!result.attempts[0].succeeded);
        assert_eq!(engine.ui.as_ref().unwrap().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn plan_failure_falls_through_to_generic_launch() {
        let engine = Orchestrator::new(
            Arc::new(TestAdapter::new(Platform::MacOs)),
            MockRunner::with_outputs(vec![MockRunner::silent_output()]),
        )
        .with_ui(MockUi::failing());
        let result = engine
            .execute(&request("play", "spotify", &[("songInfo", "take five")]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.tier, Tier::Generic);
        assert_eq!(result.method, "adapter_open_app");
        assert_eq!(result.attempts.len(), 3);
    }

    #[tokio::test]
    async fn exhausted_walk_reports_failure_not_error() {
        let mut adapter = TestAdapter::new(Platform::MacOs);
        adapter.open_app_ok = false;
        let engine = Orchestrator::new(
            Arc::new(adapter),
            // Tier 1 silent, fallback launch script silent too.
            MockRunner::with_outputs(vec![
                MockRunner::silent_output(),
                MockRunner::silent_output(),
            ]),
        )
        .with_ui(MockUi::failing());
        let result = engine
            .execute(&request(
                "play",
                "definitely-not-a-real-binary-9f3a",
                &[("songInfo", "anything")],
            ))
            .await
            .unwrap();
        // Tier 2 kicks in because no template exists for this app.
        assert!(!result.success);
        assert_eq!(result.method, "none");
        assert_eq!(result.tier, Tier::Generic);
        assert_eq!(result.attempts.len(), 2);
    }

    #[tokio::test]
    async fn missing_placeholder_fails_the_scripted_tier() {
        let engine = Orchestrator::new(
            Arc::new(TestAdapter::new(Platform::MacOs)),
            MockRunner::succeeding(),
        )
        .with_ui(MockUi::succeeding());
        let result = engine
            .execute(&request("message", "whatsapp", &[("contactName", "James")]))
            .await
            .unwrap();
        // The template never reached the runner.
        assert!(engine.runner.scripts().is_empty());
        assert!(result.attempts[0].detail.contains("placeholder"));
        assert!(result.success);
        assert_eq!(result.tier, Tier::PlanGuided);
    }

    #[tokio::test]
    async fn non_ui_action_skips_the_plan_tier() {
        let engine = Orchestrator::new(
            Arc::new(TestAdapter::new(Platform::MacOs)),
            MockRunner::succeeding(),
        )
        .with_ui(MockUi::succeeding());
        let result = engine
            .execute(&request("open", "calculator", &[]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.tier, Tier::Generic);
        assert_eq!(engine.ui.as_ref().unwrap().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn script_timeout_falls_through_to_the_plan_tier() {
        let runner = MockRunner::with_outputs(vec![Err(crate::script::ScriptError::Timeout(
            std::time::Duration::from_secs(30),
        ))]);
        let engine = Orchestrator::new(Arc::new(TestAdapter::new(Platform::MacOs)), runner)
            .with_ui(MockUi::succeeding());
        let result = engine
            .execute(&request("play", "spotify", &[("songInfo", "take five")]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.tier, Tier::PlanGuided);
        assert_eq!(result.attempts.len(), 2);
        assert!(!result.attempts[0].succeeded);
        assert!(result.attempts[0].detail.contains("timed out"));
    }

    #[tokio::test]
    async fn native_playback_short_circuits_the_tiers() {
        let mut adapter = TestAdapter::new(Platform::MacOs);
        adapter.native = Native::Handles;
        let engine = Orchestrator::new(Arc::new(adapter), MockRunner::succeeding());
        let result = engine
            .execute(&request("play", "spotify", &[("songInfo", "take five")]))
            .await
            .unwrap();
        assert!(result.success);
        // A native success is the scripted tier's answer.
        assert_eq!(result.tier, Tier::Scripted);
        assert_eq!(result.method, "adapter_native");
        assert_eq!(result.attempts.len(), 1);
        assert!(result.attempts[0].succeeded);
        assert!(engine.runner.scripts().is_empty());
    }

    #[tokio::test]
    async fn permission_denied_surfaces_as_error() {
        let mut adapter = TestAdapter::new(Platform::MacOs);
        adapter.native = Native::Denied;
        let engine = Orchestrator::new(Arc::new(adapter), MockRunner::succeeding());
        let err = engine
            .execute(&request("play", "spotify", &[("songInfo", "take five")]))
            .await
            .unwrap_err();
        let EngineError::Permission(inner) = err;
        assert!(inner.is_recoverable());
    }

    #[tokio::test]
    async fn counters_track_attempts_and_successes() {
        let engine = Orchestrator::new(
            Arc::new(TestAdapter::new(Platform::MacOs)),
            MockRunner::with_outputs(vec![MockRunner::silent_output()]),
        )
        .with_ui(MockUi::succeeding());
        engine
            .execute(&request("play", "spotify", &[("songInfo", "take five")]))
            .await
            .unwrap();
        let snapshot = engine.counters();
        assert_eq!(snapshot.attempts, [1, 1, 0]);
        assert_eq!(snapshot.successes, [0, 1, 0]);
        assert_eq!(snapshot.native_successes, 0);
    }

    #[test]
    fn app_names_normalize_to_library_keys() {
        assert_eq!(normalize_app_name("Google Chrome"), "chrome");
        assert_eq!(normalize_app_name("Apple Music"), "apple_music");
        assert_eq!(normalize_app_name("VS Code"), "vscode");
        assert_eq!(normalize_app_name("Spotify"), "spotify");
        assert_eq!(normalize_app_name("Some Other App"), "some_other_app");
    }

    #[test]
    fn intent_mapping_picks_action_and_app() {
        let params: HashMap<_, _> = [("songInfo", "take five"), ("app", "spotify")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let request = AutomationRequest::from_intent("playMusic", params);
        assert_eq!(request.action, "play");
        assert_eq!(request.app, "spotify");

        let request = AutomationRequest::from_intent("openUrl", HashMap::new());
        assert_eq!(request.action, "open_url");
        assert_eq!(request.app, "chrome");

        let request = AutomationRequest::from_intent("createNote", HashMap::new());
        assert_eq!(request.action, "create_note");
        assert_eq!(request.app, "notes");
    }

    #[test]
    fn unnamed_browser_falls_back_to_chrome() {
        // The url extractor reports browser "default"; the request must
        // target a real app, not one literally named "default".
        let classification = crate::router::IntentRouter::with_defaults().classify("go to github");
        let request = AutomationRequest::from_intent(
            classification.tool.as_deref().unwrap(),
            classification.params,
        );
        assert_eq!(request.action, "open_url");
        assert_eq!(request.app, "chrome");
        assert_eq!(
            request.params.get("url").map(String::as_str),
            Some("https://github.com")
        );
    }

    #[test]
    fn compound_actions_qualify_for_the_plan_tier_by_verb() {
        let engine = Orchestrator::new(
            Arc::new(TestAdapter::new(Platform::Linux)),
            MockRunner::succeeding(),
        )
        .with_ui(MockUi::succeeding());
        let req = request("create_note", "notes", &[]);
        assert_eq!(engine.starting_tier(&req), Tier::PlanGuided);

        // "open" is not a ui verb, so an untemplated browser goes generic.
        let req = request("open_url", "opera", &[]);
        assert_eq!(engine.starting_tier(&req), Tier::Generic);
    }

    #[test]
    fn task_descriptions_read_naturally() {
        let req = request(
            "message",
            "whatsapp",
            &[("contactName", "James"), ("message", "running late")],
        );
        assert_eq!(
            build_task_description(&req),
            "send message to James: running late"
        );

        let req = request("play", "spotify", &[]);
        assert_eq!(build_task_description(&req), "resume playback");
    }
}
