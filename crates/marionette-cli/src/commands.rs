//! Subcommand implementations.

use anyhow::Context;
use std::sync::Arc;

use marionette_core::orchestrator::{
    AutomationRequest, AutomationResult, Orchestrator, UiAutomation,
};
use marionette_core::{IntentRouter, ScriptRunner, ShellRunner};
use marionette_platform::{adapter_for, create_input_driver, detect_platform, PlatformAdapter};
use marionette_vision::{create_screen_source, HttpPlanBackend, PlanExecutor};

use crate::config::CliConfig;

fn adapter() -> Arc<dyn PlatformAdapter> {
    adapter_for(detect_platform())
}

pub fn classify(text: &str, json: bool, config: &CliConfig) -> anyhow::Result<()> {
    let router = IntentRouter::with_defaults().with_config(config.router_config());
    let result = router.classify(text);

    if json {
        let value = serde_json::json!({
            "tool": result.tool,
            "confidence": result.confidence,
            "params": result.params,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &result.tool {
        Some(tool) => {
            println!("tool: {tool}");
            println!("confidence: {:.2}", result.confidence);
            let mut params: Vec<_> = result.params.iter().collect();
            params.sort();
            for (key, value) in params {
                println!("  {key} = {value}");
            }
        }
        None => println!("no local tool matched"),
    }
    Ok(())
}

pub async fn run(
    text: &str,
    no_vision: bool,
    json: bool,
    config: &CliConfig,
) -> anyhow::Result<()> {
    let router = IntentRouter::with_defaults().with_config(config.router_config());
    let classification = router.classify(text);
    let Some(tool) = classification.tool else {
        anyhow::bail!("no local tool matched '{text}'; try rephrasing");
    };
    let params = classification.params;
    tracing::info!(%tool, confidence = classification.confidence, "classified request");

    match tool.as_str() {
        // Informational tools answered in place.
        "getTime" => println!("{}", chrono::Local::now().format("%H:%M:%S")),
        "getDate" => println!("{}", chrono::Local::now().format("%A, %B %e, %Y")),
        "getBattery" => battery(json).await?,
        "checkPermissions" => permissions(false, json).await?,
        "listApps" => apps().await?,

        // Direct adapter operations.
        "takeScreenshot" => {
            let engine = Orchestrator::new(adapter(), ShellRunner::new());
            let path = engine.take_screenshot(None).await?;
            println!("screenshot saved to {}", path.display());
        }
        "closeApp" => {
            let app = params
                .get("appName")
                .context("could not tell which app to close")?;
            let engine = Orchestrator::new(adapter(), ShellRunner::new());
            engine.close_app(app).await?;
            println!("closed {app}");
        }

        // Tiered automation.
        "playMusic" | "pauseMedia" | "nextTrack" | "messageContact" | "openUrl" | "openFile"
        | "openApp" | "createNote" => {
            let request = AutomationRequest::from_intent(&tool, params);
            execute(&request, no_vision, json, config).await?;
        }
        "searchWeb" => {
            let query = params.get("query").context("could not tell what to search for")?;
            let engine_name = params.get("engine").map(String::as_str).unwrap_or("google");
            let url = search_url(engine_name, query);
            let mut params = params.clone();
            params.insert("url".to_string(), url);
            let request = AutomationRequest::from_intent("openUrl", params);
            execute(&request, no_vision, json, config).await?;
        }

        other => anyhow::bail!("'{other}' matched but has no local handler yet"),
    }
    Ok(())
}

fn search_url(engine: &str, query: &str) -> String {
    let q: String = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("+");
    match engine {
        "bing" => format!("https://www.bing.com/search?q={q}"),
        "duckduckgo" => format!("https://duckduckgo.com/?q={q}"),
        _ => format!("https://www.google.com/search?q={q}"),
    }
}

async fn execute(
    request: &AutomationRequest,
    no_vision: bool,
    json: bool,
    config: &CliConfig,
) -> anyhow::Result<()> {
    let runner = ShellRunner::with_timeout(config.script_timeout());
    let engine =
        Orchestrator::new(adapter(), runner).with_config(config.orchestrator_config());

    if !no_vision {
        match HttpPlanBackend::from_env() {
            Ok(backend) => match create_input_driver() {
                Ok(input) => {
                    let mut backend = backend;
                    if let Some(url) = &config.vision.api_url {
                        backend = backend.with_api_url(url.as_str());
                    }
                    if let Some(model) = &config.vision.model {
                        backend = backend.with_model(model.as_str());
                    }
                    let executor = PlanExecutor::new(create_screen_source(), backend, input);
                    return run_engine(engine.with_ui(executor), request, json).await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "input synthesis unavailable, plan tier disabled")
                }
            },
            Err(err) => tracing::debug!(error = %err, "plan tier disabled"),
        }
    }

    run_engine(engine, request, json).await
}

async fn run_engine<R: ScriptRunner, U: UiAutomation>(
    engine: Orchestrator<R, U>,
    request: &AutomationRequest,
    json: bool,
) -> anyhow::Result<()> {
    let result = engine
        .execute(request)
        .await
        .context("automation aborted")?;
    report(&result, json)
}

fn report(result: &AutomationResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    for attempt in &result.attempts {
        let status = if attempt.succeeded { "ok" } else { "failed" };
        println!("{}: {status} ({})", attempt.tier, attempt.detail);
    }
    if result.success {
        println!("done via {} in {}ms", result.method, result.elapsed_ms);
    } else {
        anyhow::bail!("automation failed after {} tier(s)", result.attempts.len());
    }
    Ok(())
}

pub fn caps(json: bool) -> anyhow::Result<()> {
    let platform = detect_platform();
    let caps = adapter_for(platform).capabilities();
    if json {
        let value = serde_json::json!({ "platform": platform.to_string(), "capabilities": caps });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    println!("platform: {platform}");
    for (name, enabled) in [
        ("music_control", caps.music_control),
        ("file_operations", caps.file_operations),
        ("file_editing", caps.file_editing),
        ("screenshot", caps.screenshot),
        ("messaging", caps.messaging),
        ("system_control", caps.system_control),
    ] {
        println!("  {name}: {enabled}");
    }
    Ok(())
}

pub async fn apps() -> anyhow::Result<()> {
    let apps = adapter().list_installed_apps().await?;
    if apps.is_empty() {
        println!("no applications found");
    }
    for app in apps {
        println!("{app}");
    }
    Ok(())
}

pub async fn battery(json: bool) -> anyhow::Result<()> {
    let status = adapter().get_battery().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    match status.percentage {
        Some(pct) => {
            let state = match status.charging {
                Some(true) => " (charging)",
                Some(false) => " (discharging)",
                None => "",
            };
            println!("battery: {pct}%{state}");
        }
        None => println!("battery level unknown: {}", status.raw.trim()),
    }
    Ok(())
}

pub async fn permissions(request: bool, json: bool) -> anyhow::Result<()> {
    let adapter = adapter();
    let report = if request {
        adapter.request_permissions().await?
    } else {
        adapter.check_permissions().await?
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if report.entries.is_empty() {
        println!("no permissions to check on this platform");
        return Ok(());
    }
    for entry in &report.entries {
        let mark = if entry.granted { "granted" } else { "missing" };
        match (&entry.remediation, entry.granted) {
            (Some(fix), false) => println!("{}: {mark} ({fix})", entry.name),
            _ => println!("{}: {mark}", entry.name),
        }
    }
    Ok(())
}
