//! Platform detection and capability flags.
//!
//! Detection runs exactly once, at engine construction; the resulting
//! adapter is passed around as an explicit dependency rather than read
//! from a global.

use serde::{Deserialize, Serialize};

/// Environment variable that overrides OS detection. Used by mobile
/// wrappers that run the engine inside an embedded runtime where the
/// compile target alone is not enough to tell.
pub const DEVICE_TYPE_ENV: &str = "MARIONETTE_DEVICE_TYPE";

/// The platform families the engine distinguishes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
    Android,
    Ios,
}

impl Platform {
    /// Short identifier used in logs and template keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Self::Android | Self::Ios)
    }

    pub fn is_desktop(&self) -> bool {
        !self.is_mobile()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "macos" | "darwin" | "mac" => Ok(Self::MacOs),
            "windows" | "win" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Detect the platform the engine is running on.
///
/// `MARIONETTE_DEVICE_TYPE` wins over the compile target when set to a
/// recognized name, so an Android host embedding a Linux binary still
/// reports `android`.
pub fn detect_platform() -> Platform {
    if let Ok(value) = std::env::var(DEVICE_TYPE_ENV) {
        if let Ok(platform) = value.parse() {
            return platform;
        }
        tracing::warn!(value, "ignoring unrecognized {DEVICE_TYPE_ENV}");
    }

    #[cfg(target_os = "macos")]
    {
        Platform::MacOs
    }
    #[cfg(target_os = "windows")]
    {
        Platform::Windows
    }
    #[cfg(target_os = "ios")]
    {
        Platform::Ios
    }
    #[cfg(target_os = "android")]
    {
        Platform::Android
    }
    #[cfg(not(any(
        target_os = "macos",
        target_os = "windows",
        target_os = "ios",
        target_os = "android"
    )))]
    {
        Platform::Linux
    }
}

/// What a platform family can do. Callers check these before dispatching
/// rather than probing for errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub music_control: bool,
    pub file_operations: bool,
    pub file_editing: bool,
    pub screenshot: bool,
    pub messaging: bool,
    pub system_control: bool,
}

impl CapabilitySet {
    /// Capability flags for a platform family.
    pub fn for_platform(platform: Platform) -> Self {
        let desktop = platform.is_desktop();
        Self {
            music_control: true,
            file_operations: true,
            file_editing: desktop,
            screenshot: desktop,
            messaging: true,
            system_control: desktop,
        }
    }

    /// Look a capability up by its name. Unknown names are `false`.
    pub fn has(&self, name: &str) -> bool {
        match name {
            "music_control" => self.music_control,
            "file_operations" => self.file_operations,
            "file_editing" => self.file_editing,
            "screenshot" => self.screenshot,
            "messaging" => self.messaging,
            "system_control" => self.system_control,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_platforms_have_all_capabilities() {
        for platform in [Platform::MacOs, Platform::Windows, Platform::Linux] {
            let caps = CapabilitySet::for_platform(platform);
            assert!(caps.music_control);
            assert!(caps.file_editing);
            assert!(caps.screenshot);
            assert!(caps.system_control);
        }
    }

    #[test]
    fn mobile_platforms_are_restricted() {
        for platform in [Platform::Android, Platform::Ios] {
            let caps = CapabilitySet::for_platform(platform);
            assert!(caps.music_control);
            assert!(caps.messaging);
            assert!(!caps.screenshot);
            assert!(!caps.system_control);
            assert!(!caps.file_editing);
        }
    }

    #[test]
    fn platform_parses_aliases() {
        assert_eq!("darwin".parse::<Platform>().unwrap(), Platform::MacOs);
        assert_eq!("WIN".parse::<Platform>().unwrap(), Platform::Windows);
        assert!("beos".parse::<Platform>().is_err());
    }

    #[test]
    fn capability_lookup_by_name() {
        let caps = CapabilitySet::for_platform(Platform::Linux);
        assert!(caps.has("screenshot"));
        assert!(!caps.has("teleportation"));
    }
}
