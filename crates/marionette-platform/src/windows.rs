//! Windows adapter, built on PowerShell and the classic command-line
//! tooling (`start`, `Stop-Process`, WMIC, `Get-StartApps`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::adapter::{
    run_tool_checked, BatteryStatus, PermissionReport, PermissionStatus, PlatformAdapter,
};
use crate::error::{PlatformError, PlatformResult};
use crate::platform::Platform;

const ADMIN_REMEDIATION: &str = "run from an elevated (Administrator) prompt";

#[derive(Debug, Default)]
pub struct WindowsAdapter;

impl WindowsAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn powershell(&self, script: &str) -> PlatformResult<String> {
        run_tool_checked("powershell", &["-NoProfile", "-Command", script]).await
    }

    async fn is_admin(&self) -> bool {
        self.powershell(
            "([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent()).IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)",
        )
        .await
        .map(|out| out.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
    }
}

#[async_trait]
impl PlatformAdapter for WindowsAdapter {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    async fn play_music(&self, song: &str, app: &str) -> PlatformResult<()> {
        // Spotify registers a URI scheme that reaches the search view
        // directly; other players have no native path here.
        if app != "spotify" {
            return Err(PlatformError::unsupported("play_music"));
        }
        let uri = if song.is_empty() {
            "spotify:".to_string()
        } else {
            format!("spotify:search:{}", song.replace(' ', "%20"))
        };
        self.powershell(&format!("Start-Process '{uri}'")).await?;
        Ok(())
    }

    async fn open_file(&self, path: &Path) -> PlatformResult<()> {
        let path_str = path.to_string_lossy().into_owned();
        run_tool_checked("cmd", &["/C", "start", "", &path_str]).await?;
        Ok(())
    }

    async fn take_screenshot(&self, path: Option<&Path>) -> PlatformResult<PathBuf> {
        let target = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::temp_dir().join("marionette-screenshot.png"));
        let target_str = target.to_string_lossy().into_owned();
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
             $b = [System.Windows.Forms.Screen]::PrimaryScreen.Bounds; \
             $img = New-Object System.Drawing.Bitmap $b.Width, $b.Height; \
             $g = [System.Drawing.Graphics]::FromImage($img); \
             $g.CopyFromScreen($b.Location, [System.Drawing.Point]::Empty, $b.Size); \
             $img.Save('{target_str}')"
        );
        self.powershell(&script).await?;
        Ok(target)
    }

    async fn open_app(&self, name: &str) -> PlatformResult<()> {
        run_tool_checked("cmd", &["/C", "start", "", name]).await?;
        Ok(())
    }

    async fn close_app(&self, name: &str) -> PlatformResult<()> {
        let escaped = name.replace('\'', "''");
        self.powershell(&format!("Stop-Process -Name '{escaped}' -Force"))
            .await?;
        Ok(())
    }

    async fn get_battery(&self) -> PlatformResult<BatteryStatus> {
        let output = run_tool_checked(
            "WMIC",
            &["Path", "Win32_Battery", "Get", "EstimatedChargeRemaining"],
        )
        .await?;
        // First non-empty line is the column header, the second the value.
        let percentage = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .nth(1)
            .and_then(|line| line.parse().ok());
        Ok(BatteryStatus {
            percentage,
            charging: None,
            raw: output.trim().to_string(),
        })
    }

    async fn check_permissions(&self) -> PlatformResult<PermissionReport> {
        let is_admin = self.is_admin().await;
        Ok(PermissionReport {
            entries: vec![PermissionStatus {
                name: "admin_privileges".into(),
                granted: is_admin,
                remediation: (!is_admin).then(|| ADMIN_REMEDIATION.into()),
            }],
        })
    }

    async fn request_permissions(&self) -> PlatformResult<PermissionReport> {
        if !self.is_admin().await {
            return Err(PlatformError::permission_denied(
                "admin_privileges",
                ADMIN_REMEDIATION,
            ));
        }
        self.check_permissions().await
    }

    async fn list_installed_apps(&self) -> PlatformResult<Vec<String>> {
        let output = self
            .powershell("Get-StartApps | Select-Object Name, AppID | ConvertTo-Json")
            .await?;
        let parsed: serde_json::Value =
            serde_json::from_str(output.trim()).map_err(|e| PlatformError::Parse {
                what: "Get-StartApps output".into(),
                detail: e.to_string(),
            })?;
        // A single app comes back as an object rather than an array.
        let entries = match parsed {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };
        let mut apps: Vec<String> = entries
            .iter()
            .filter_map(|entry| entry.get("Name").and_then(|name| name.as_str()))
            .map(str::to_string)
            .collect();
        apps.sort_by_key(|name| name.to_lowercase());
        apps.dedup();
        Ok(apps)
    }
}
