//! Action plans: the steps a vision model proposes and the parser that
//! turns raw model output into them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("no JSON array found in model output")]
    NoJsonFound,

    #[error("failed to parse plan: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model returned an empty plan")]
    Empty,
}

/// One primitive step in a plan. The wire format is the tagged form the
/// planner prompt asks for: `{"type": "click", "x": 100, "y": 200}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    /// Click at absolute screen coordinates.
    Click { x: i32, y: i32 },
    /// Type literal text at the current focus.
    Type { text: String },
    /// Press a key or combination, e.g. `"Return"` or `"Ctrl+F"`.
    Key { combo: String },
    /// Pause to let the UI settle.
    Wait { ms: u64 },
    /// Scroll by a delta.
    Scroll {
        #[serde(default)]
        dx: i32,
        #[serde(default)]
        dy: i32,
    },
}

impl PlanStep {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::Key { .. } => "key",
            Self::Wait { .. } => "wait",
            Self::Scroll { .. } => "scroll",
        }
    }
}

/// A parsed plan for one task in one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub app: String,
    pub task: String,
    pub steps: Vec<PlanStep>,
}

impl ActionPlan {
    pub fn new(app: impl Into<String>, task: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            app: app.into(),
            task: task.into(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parse model output into steps.
///
/// Models wrap JSON in markdown fences or chatter around it often enough
/// that straight deserialization is the exception. Strategy: strip fences,
/// try the whole string, then fall back to the outermost `[...]` span.
/// The array itself is parsed strictly; a malformed step fails the plan.
pub fn parse_steps(raw: &str) -> Result<Vec<PlanStep>, PlanError> {
    let cleaned = strip_fences(raw);

    let steps: Vec<PlanStep> = match serde_json::from_str(cleaned) {
        Ok(steps) => steps,
        Err(_) => {
            let start = cleaned.find('[').ok_or(PlanError::NoJsonFound)?;
            let end = cleaned.rfind(']').ok_or(PlanError::NoJsonFound)?;
            if end <= start {
                return Err(PlanError::NoJsonFound);
            }
            serde_json::from_str(&cleaned[start..=end])?
        }
    };

    if steps.is_empty() {
        return Err(PlanError::Empty);
    }
    Ok(steps)
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening fence line.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_array() {
        let steps = parse_steps(r#"[{"type": "click", "x": 100, "y": 200}]"#).unwrap();
        assert_eq!(steps, vec![PlanStep::Click { x: 100, y: 200 }]);
    }

    #[test]
    fn parses_fenced_output() {
        let raw = "```json\n[{\"type\": \"type\", \"text\": \"hello\"}]\n```";
        let steps = parse_steps(raw).unwrap();
        assert_eq!(
            steps,
            vec![PlanStep::Type {
                text: "hello".into()
            }]
        );
    }

    #[test]
    fn extracts_array_from_chatter() {
        let raw = "Here is the plan:\n[{\"type\": \"key\", \"combo\": \"Ctrl+F\"}]\nGood luck!";
        let steps = parse_steps(raw).unwrap();
        assert_eq!(
            steps,
            vec![PlanStep::Key {
                combo: "Ctrl+F".into()
            }]
        );
    }

    #[test]
    fn rejects_output_without_json() {
        assert!(matches!(
            parse_steps("I cannot see a search field."),
            Err(PlanError::NoJsonFound)
        ));
    }

    #[test]
    fn rejects_empty_plans() {
        assert!(matches!(parse_steps("[]"), Err(PlanError::Empty)));
    }

    #[test]
    fn malformed_step_fails_the_plan() {
        let raw = r#"[{"type": "click", "x": 1, "y": 2}, {"type": "levitate"}]"#;
        assert!(matches!(parse_steps(raw), Err(PlanError::InvalidJson(_))));
    }

    #[test]
    fn scroll_deltas_default_to_zero() {
        let steps = parse_steps(r#"[{"type": "scroll", "dy": -5}]"#).unwrap();
        assert_eq!(steps, vec![PlanStep::Scroll { dx: 0, dy: -5 }]);
    }

    #[test]
    fn step_serialization_round_trips() {
        let step = PlanStep::Wait { ms: 500 };
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"type\":\"wait\""));
        let back: PlanStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }
}
