//! macOS adapter, built on AppleScript and the standard command-line
//! tooling (`open`, `screencapture`, `pmset`, `mdfind`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::adapter::{
    run_tool, run_tool_checked, BatteryStatus, PermissionReport, PermissionStatus, PlatformAdapter,
};
use crate::error::{PlatformError, PlatformResult};
use crate::platform::Platform;

const ACCESSIBILITY_REMEDIATION: &str =
    "System Settings > Privacy & Security > Accessibility: enable your terminal";
const SCREEN_RECORDING_REMEDIATION: &str =
    "System Settings > Privacy & Security > Screen Recording: enable your terminal";

#[derive(Debug, Default)]
pub struct MacOsAdapter;

impl MacOsAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn osascript(&self, lines: &[&str]) -> PlatformResult<String> {
        let mut args = Vec::with_capacity(lines.len() * 2);
        for line in lines {
            args.push("-e");
            args.push(*line);
        }
        run_tool_checked("osascript", &args).await
    }

    /// Probe Accessibility by asking System Events for the frontmost
    /// process. Fails without the permission, succeeds with it.
    async fn probe_accessibility(&self) -> bool {
        self.osascript(&[
            "tell application \"System Events\" to name of first item of (every process whose frontmost is true)",
        ])
        .await
        .is_ok()
    }

    /// Probe Screen Recording with a 1x1 capture; a denied permission
    /// makes `screencapture` fail.
    async fn probe_screen_recording(&self) -> bool {
        let probe = std::env::temp_dir().join("marionette-perm-probe.png");
        let probe_str = probe.to_string_lossy().into_owned();
        let ok = run_tool("screencapture", &["-x", "-R0,0,1,1", &probe_str])
            .await
            .map(|out| out.status.success())
            .unwrap_or(false);
        let _ = tokio::fs::remove_file(&probe).await;
        ok
    }
}

#[async_trait]
impl PlatformAdapter for MacOsAdapter {
    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    async fn play_music(&self, song: &str, app: &str) -> PlatformResult<()> {
        // Native handling exists only for the scriptable players; anything
        // else goes through the tiered strategies instead.
        let app_name = match app {
            "spotify" => "Spotify",
            "music" | "apple_music" => "Music",
            _ => return Err(PlatformError::unsupported("play_music")),
        };

        let activate = format!("tell application \"{app_name}\" to activate");
        if app_name == "Spotify" && !song.is_empty() {
            let uri = format!("spotify:search:{}", song.replace('"', ""));
            let play = format!("tell application \"Spotify\" to play track \"{uri}\"");
            self.osascript(&[&activate, &play]).await?;
        } else {
            let play = format!("tell application \"{app_name}\" to play");
            self.osascript(&[&activate, &play]).await?;
        }
        tracing::info!(song, app, "native playback started");
        Ok(())
    }

    async fn open_file(&self, path: &Path) -> PlatformResult<()> {
        let path_str = path.to_string_lossy().into_owned();
        run_tool_checked("open", &[&path_str]).await?;
        Ok(())
    }

    async fn take_screenshot(&self, path: Option<&Path>) -> PlatformResult<PathBuf> {
        let target = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::temp_dir().join("marionette-screenshot.png"));
        let target_str = target.to_string_lossy().into_owned();
        let output = run_tool("screencapture", &["-x", &target_str]).await?;
        if !output.status.success() {
            // A denied Screen Recording permission is the common cause of a
            // silent screencapture failure.
            if !self.probe_screen_recording().await {
                return Err(PlatformError::permission_denied(
                    "screen_recording",
                    SCREEN_RECORDING_REMEDIATION,
                ));
            }
            return Err(PlatformError::command_failed(
                "screencapture",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(target)
    }

    async fn open_app(&self, name: &str) -> PlatformResult<()> {
        if run_tool_checked("open", &["-a", name]).await.is_ok() {
            return Ok(());
        }
        // Names that are really paths fall through to a bare `open`.
        run_tool_checked("open", &[name]).await?;
        Ok(())
    }

    async fn close_app(&self, name: &str) -> PlatformResult<()> {
        let quit = format!("quit app \"{name}\"");
        if self.osascript(&[&quit]).await.is_ok() {
            return Ok(());
        }
        tracing::debug!(app = name, "graceful quit failed, force killing");
        run_tool_checked("pkill", &["-f", name]).await?;
        Ok(())
    }

    async fn get_battery(&self) -> PlatformResult<BatteryStatus> {
        let output = run_tool_checked("pmset", &["-g", "batt"]).await?;
        let charging = output.contains("AC Power") || output.contains("charging");
        Ok(BatteryStatus {
            percentage: crate::adapter::parse_percent(&output),
            charging: Some(charging),
            raw: output.trim().to_string(),
        })
    }

    async fn check_permissions(&self) -> PlatformResult<PermissionReport> {
        let accessibility = self.probe_accessibility().await;
        let screen_recording = self.probe_screen_recording().await;
        Ok(PermissionReport {
            entries: vec![
                PermissionStatus {
                    name: "accessibility".into(),
                    granted: accessibility,
                    remediation: (!accessibility).then(|| ACCESSIBILITY_REMEDIATION.into()),
                },
                PermissionStatus {
                    name: "screen_recording".into(),
                    granted: screen_recording,
                    remediation: (!screen_recording).then(|| SCREEN_RECORDING_REMEDIATION.into()),
                },
            ],
        })
    }

    async fn request_permissions(&self) -> PlatformResult<PermissionReport> {
        // The probes themselves trigger the system prompts on first use;
        // re-probing after is all macOS lets us do programmatically.
        self.check_permissions().await
    }

    async fn list_installed_apps(&self) -> PlatformResult<Vec<String>> {
        let output = run_tool_checked(
            "mdfind",
            &["kMDItemContentType == 'com.apple.application-bundle'"],
        )
        .await?;
        let mut apps: Vec<String> = output
            .lines()
            .filter(|line| line.starts_with('/'))
            .filter_map(|path| {
                Path::new(path)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .collect();
        apps.sort_by_key(|name| name.to_lowercase());
        apps.dedup();
        Ok(apps)
    }
}
