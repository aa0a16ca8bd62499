//! Error types for platform adapters and input drivers.

use thiserror::Error;

/// Errors raised by platform capability adapters.
///
/// Adapters never panic past this boundary: every failure mode, including
/// "this platform simply cannot do that", is a variant here. `Unsupported`
/// and `PermissionDenied` are deliberately distinct from `CommandFailed` so
/// callers can tell "not implemented" from "tried and failed" from
/// "the user has to grant something first".
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The operation is not available on this platform family.
    #[error("'{operation}' is not supported on this platform")]
    Unsupported { operation: String },

    /// A system permission is missing. Recoverable by the user, not by
    /// falling back to another strategy.
    #[error("permission denied: {permission} ({remediation})")]
    PermissionDenied {
        permission: String,
        remediation: String,
    },

    /// A shell command ran and reported failure.
    #[error("command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// A required external tool is not installed.
    #[error("required tool `{tool}` not found on PATH")]
    ToolMissing { tool: String },

    /// Output from a system tool could not be interpreted.
    #[error("failed to parse {what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn permission_denied(
        permission: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
            remediation: remediation.into(),
        }
    }

    pub fn command_failed(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Whether the user can fix this without a code change.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Whether this is a structured "not implemented here" rather than a
    /// real failure.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Result alias used throughout the platform layer.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors raised by input drivers.
#[derive(Debug, Error)]
pub enum InputError {
    /// No input backend is available (headless session, feature disabled).
    #[error("input synthesis is not available: {0}")]
    NotAvailable(String),

    /// The backend accepted the request but synthesis failed.
    #[error("input synthesis failed: {0}")]
    Synthesis(String),

    /// A key combination string could not be parsed.
    #[error("invalid key combination '{0}'")]
    InvalidCombo(String),
}

pub type InputResult<T> = Result<T, InputError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_recoverable() {
        let err = PlatformError::permission_denied(
            "accessibility",
            "System Settings > Privacy & Security > Accessibility",
        );
        assert!(err.is_recoverable());
        assert!(!err.is_unsupported());
    }

    #[test]
    fn unsupported_is_not_a_failure() {
        let err = PlatformError::unsupported("take_screenshot");
        assert!(err.is_unsupported());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("take_screenshot"));
    }
}
