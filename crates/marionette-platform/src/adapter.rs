//! The platform capability adapter seam.
//!
//! One adapter exists per platform family. It is selected once by
//! [`adapter_for`] and injected into the orchestration engine as an
//! `Arc<dyn PlatformAdapter>`; nothing in this crate holds a global
//! instance.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, PlatformResult};
use crate::linux::LinuxAdapter;
use crate::macos::MacOsAdapter;
use crate::mobile::MobileAdapter;
use crate::platform::{CapabilitySet, Platform};
use crate::windows::WindowsAdapter;

/// Battery state as reported by the platform's power tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge percentage, when the tooling reported one.
    pub percentage: Option<u8>,
    /// Whether the device is on external power.
    pub charging: Option<bool>,
    /// Raw tool output, kept for diagnostics.
    pub raw: String,
}

/// One probed system permission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionStatus {
    pub name: String,
    pub granted: bool,
    /// Where the user grants this when it is missing.
    pub remediation: Option<String>,
}

/// Result of probing every permission the adapter cares about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionReport {
    pub entries: Vec<PermissionStatus>,
}

impl PermissionReport {
    pub fn all_granted(&self) -> bool {
        self.entries.iter().all(|entry| entry.granted)
    }

    pub fn missing(&self) -> impl Iterator<Item = &PermissionStatus> {
        self.entries.iter().filter(|entry| !entry.granted)
    }
}

/// Platform-specific operations behind a uniform async surface.
///
/// Every method returns `PlatformResult`; an adapter that cannot perform
/// an operation returns [`PlatformError::Unsupported`] rather than
/// panicking or silently succeeding.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform family this adapter serves.
    fn platform(&self) -> Platform;

    /// Static capability flags for this platform.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::for_platform(self.platform())
    }

    /// Native music playback handler. Orchestration consults this before
    /// any scripted tier; `Unsupported` means "no native handler, carry
    /// on", not failure.
    async fn play_music(&self, song: &str, app: &str) -> PlatformResult<()>;

    /// Open a file with the platform's default handler.
    async fn open_file(&self, path: &Path) -> PlatformResult<()>;

    /// Capture the screen to `path` (or a platform default location) and
    /// return where the image landed.
    async fn take_screenshot(&self, path: Option<&Path>) -> PlatformResult<PathBuf>;

    /// Launch an application by name.
    async fn open_app(&self, name: &str) -> PlatformResult<()>;

    /// Close an application, gracefully where the platform allows it.
    async fn close_app(&self, name: &str) -> PlatformResult<()>;

    /// Query battery state.
    async fn get_battery(&self) -> PlatformResult<BatteryStatus>;

    /// Probe the permissions automation needs on this platform.
    async fn check_permissions(&self) -> PlatformResult<PermissionReport>;

    /// Prompt the user toward granting missing permissions, then re-probe.
    async fn request_permissions(&self) -> PlatformResult<PermissionReport>;

    /// Enumerate installed applications, deduplicated and sorted.
    async fn list_installed_apps(&self) -> PlatformResult<Vec<String>>;
}

/// Build the adapter for a detected platform.
pub fn adapter_for(platform: Platform) -> Arc<dyn PlatformAdapter> {
    match platform {
        Platform::MacOs => Arc::new(MacOsAdapter::new()),
        Platform::Windows => Arc::new(WindowsAdapter::new()),
        Platform::Linux => Arc::new(LinuxAdapter::new()),
        Platform::Android | Platform::Ios => Arc::new(MobileAdapter::new(platform)),
    }
}

/// Run an external command, mapping spawn failures and non-UTF8 output
/// into `PlatformError`. Shared by the concrete adapters.
pub(crate) async fn run_tool(program: &str, args: &[&str]) -> PlatformResult<Output> {
    tracing::debug!(program, ?args, "running platform tool");
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlatformError::ToolMissing {
                    tool: program.to_string(),
                }
            } else {
                PlatformError::Io(e)
            }
        })?;
    Ok(output)
}

/// Like [`run_tool`] but treats a non-zero exit status as failure.
pub(crate) async fn run_tool_checked(program: &str, args: &[&str]) -> PlatformResult<String> {
    let output = run_tool(program, args).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlatformError::command_failed(
            program,
            stderr.trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Pull the first `NN%` out of power-tool output.
pub(crate) fn parse_percent(text: &str) -> Option<u8> {
    let bytes = text.as_bytes();
    let pos = text.find('%')?;
    let mut start = pos;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == pos {
        return None;
    }
    text[start..pos].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_parsing_from_tool_output() {
        assert_eq!(
            parse_percent("-InternalBattery-0 (id=123)\t87%; discharging"),
            Some(87)
        );
        assert_eq!(parse_percent("Battery 0: Charging, 5%"), Some(5));
        assert_eq!(parse_percent("no battery present"), None);
        assert_eq!(parse_percent("% with nothing before it"), None);
    }

    #[test]
    fn factory_matches_platform() {
        for platform in [
            Platform::MacOs,
            Platform::Windows,
            Platform::Linux,
            Platform::Android,
        ] {
            let adapter = adapter_for(platform);
            assert_eq!(adapter.platform(), platform);
            assert_eq!(
                adapter.capabilities(),
                CapabilitySet::for_platform(platform)
            );
        }
    }

    #[test]
    fn permission_report_missing_filter() {
        let report = PermissionReport {
            entries: vec![
                PermissionStatus {
                    name: "accessibility".into(),
                    granted: true,
                    remediation: None,
                },
                PermissionStatus {
                    name: "screen_recording".into(),
                    granted: false,
                    remediation: Some("System Settings > Privacy & Security".into()),
                },
            ],
        };
        assert!(!report.all_granted());
        assert_eq!(report.missing().count(), 1);
    }
}
