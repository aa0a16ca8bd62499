//! Platform layer for the marionette automation engine.
//!
//! This crate answers two questions for the tiers above it:
//! - *What can this machine do?* — [`detect_platform`], [`CapabilitySet`],
//!   and one [`PlatformAdapter`] per platform family, selected once via
//!   [`adapter_for`] and injected as an explicit dependency.
//! - *How do I touch the machine?* — the [`InputDriver`] primitives that
//!   plan-guided automation replays against the desktop.
//!
//! Adapters wrap the platform's own tooling (AppleScript, PowerShell,
//! D-Bus) and never let an error escape as a panic; unsupported operations
//! and missing permissions are distinct, recoverable error kinds.

pub mod adapter;
pub mod error;
pub mod input;
pub mod linux;
pub mod macos;
pub mod mobile;
pub mod platform;
pub mod windows;

pub use adapter::{
    adapter_for, BatteryStatus, PermissionReport, PermissionStatus, PlatformAdapter,
};
pub use error::{InputError, InputResult, PlatformError, PlatformResult};
pub use input::{create_input_driver, InputDriver, KeyCombo, Modifier, MouseButton};
pub use platform::{detect_platform, CapabilitySet, Platform, DEVICE_TYPE_ENV};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_respects_env_override() {
        // Serialized via a unique variable read; detect_platform checks the
        // env on every call.
        std::env::set_var(DEVICE_TYPE_ENV, "android");
        assert_eq!(detect_platform(), Platform::Android);
        std::env::remove_var(DEVICE_TYPE_ENV);
        assert!(detect_platform().is_desktop());
    }
}
