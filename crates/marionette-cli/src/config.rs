//! Configuration loading for the CLI.
//!
//! Read from `<config dir>/marionette/config.toml` when present;
//! everything has a default, so a missing or partial file is fine.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use marionette_core::orchestrator::OrchestratorConfig;
use marionette_core::router::RouterConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub router: RouterSection,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub vision: VisionSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSection {
    /// Minimum confidence to act on a classification.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    marionette_core::router::DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Wall-clock budget for one scripted attempt, in seconds.
    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,

    /// Actions worth the vision-guided tier. Empty means the built-in set.
    #[serde(default)]
    pub ui_actions: Vec<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            script_timeout_secs: default_script_timeout(),
            ui_actions: Vec::new(),
        }
    }
}

fn default_script_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisionSection {
    /// Override the planner endpoint.
    pub api_url: Option<String>,

    /// Override the planner model.
    pub model: Option<String>,
}

impl CliConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("marionette").join("config.toml"))
    }

    /// Load the config file, falling back to defaults when it is missing
    /// or unreadable. A file that exists but does not parse is an error;
    /// silently ignoring a typo'd config is worse than refusing to start.
    pub fn load() -> anyhow::Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let config = toml::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
                tracing::debug!(path = %path.display(), "loaded config");
                Ok(config)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            threshold: self.router.threshold,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        if self.engine.ui_actions.is_empty() {
            OrchestratorConfig::default()
        } else {
            OrchestratorConfig {
                ui_actions: self.engine.ui_actions.iter().cloned().collect::<HashSet<_>>(),
            }
        }
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.script_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: CliConfig = toml::from_str("[router]\nthreshold = 0.8\n").unwrap();
        assert_eq!(config.router.threshold, 0.8);
        assert_eq!(config.engine.script_timeout_secs, 30);
        assert!(config.vision.api_url.is_none());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.router.threshold, 0.75);
        assert!(config.orchestrator_config().ui_actions.contains("play"));
    }

    #[test]
    fn ui_actions_override_replaces_the_set() {
        let config: CliConfig =
            toml::from_str("[engine]\nui_actions = [\"play\"]\n").unwrap();
        let engine = config.orchestrator_config();
        assert!(engine.ui_actions.contains("play"));
        assert!(!engine.ui_actions.contains("message"));
    }
}
