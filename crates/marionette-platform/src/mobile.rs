//! Mobile adapter. Desktop automation does not exist on Android/iOS;
//! everything funnels through an optional native bridge, and anything
//! the bridge does not cover reports a structured `Unsupported` rather
//! than a failure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::adapter::{BatteryStatus, PermissionReport, PlatformAdapter};
use crate::error::{PlatformError, PlatformResult};
use crate::platform::Platform;

/// Set to `1` by the embedding app when a native IPC bridge is wired up.
pub const NATIVE_BRIDGE_ENV: &str = "MARIONETTE_NATIVE_BRIDGE";

#[derive(Debug)]
pub struct MobileAdapter {
    platform: Platform,
    bridge_available: bool,
}

impl MobileAdapter {
    pub fn new(platform: Platform) -> Self {
        let bridge_available = std::env::var(NATIVE_BRIDGE_ENV).as_deref() == Ok("1");
        Self {
            platform,
            bridge_available,
        }
    }

    fn native(&self, operation: &str) -> PlatformError {
        if self.bridge_available {
            // Bridge IPC is host-app territory; from this side the
            // operation is still unsupported.
            tracing::debug!(operation, "native bridge present but not reachable from engine");
        }
        PlatformError::unsupported(operation)
    }
}

#[async_trait]
impl PlatformAdapter for MobileAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn play_music(&self, _song: &str, _app: &str) -> PlatformResult<()> {
        Err(self.native("play_music"))
    }

    async fn open_file(&self, _path: &Path) -> PlatformResult<()> {
        Err(self.native("open_file"))
    }

    async fn take_screenshot(&self, _path: Option<&Path>) -> PlatformResult<PathBuf> {
        Err(self.native("take_screenshot"))
    }

    async fn open_app(&self, _name: &str) -> PlatformResult<()> {
        Err(self.native("open_app"))
    }

    async fn close_app(&self, _name: &str) -> PlatformResult<()> {
        Err(self.native("close_app"))
    }

    async fn get_battery(&self) -> PlatformResult<BatteryStatus> {
        Err(self.native("get_battery"))
    }

    async fn check_permissions(&self) -> PlatformResult<PermissionReport> {
        Err(self.native("check_permissions"))
    }

    async fn request_permissions(&self) -> PlatformResult<PermissionReport> {
        Err(self.native("request_permissions"))
    }

    async fn list_installed_apps(&self) -> PlatformResult<Vec<String>> {
        Err(self.native("list_installed_apps"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mobile_reports_unsupported_not_failed() {
        let adapter = MobileAdapter::new(Platform::Android);
        let err = adapter.open_app("spotify").await.unwrap_err();
        assert!(err.is_unsupported());
        assert!(!err.is_recoverable());
    }
}
