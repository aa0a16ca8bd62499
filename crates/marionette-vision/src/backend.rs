//! Plan backend: the vision model client that turns a screenshot and a
//! task description into an action plan.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::capture::{CaptureError, Screenshot};
use crate::plan::{parse_steps, ActionPlan, PlanError, PlanStep};

/// Environment variable holding the vision API key.
pub const API_KEY_ENV: &str = "MARIONETTE_VISION_API_KEY";

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";
const MAX_IMAGE_DIMENSION: u32 = 1920;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("no API key set; export {API_KEY_ENV}")]
    MissingApiKey,

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rate limited by vision API")]
    RateLimited,

    #[error("API returned status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("unexpected API response shape: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Asks some vision model for a plan. Mocked out in tests; the real
/// implementation is [`HttpPlanBackend`].
#[async_trait]
pub trait PlanBackend: Send + Sync {
    async fn plan(
        &self,
        app: &str,
        task: &str,
        screenshot: &Screenshot,
    ) -> Result<ActionPlan, BackendError>;
}

/// OpenAI-compatible chat-completions client with image input.
pub struct HttpPlanBackend {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl HttpPlanBackend {
    /// Create a backend reading the API key from the environment.
    pub fn from_env() -> Result<Self, BackendError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| BackendError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Point at a different OpenAI-compatible endpoint.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The prompt encodes the desktop-UI priors that make short plans
    /// land: where search fields usually sit, which shortcuts beat
    /// pixel-hunting.
    fn build_prompt(app: &str, task: &str, width: u32, height: u32) -> String {
        format!(
            "You are controlling a desktop application via mouse and keyboard.\n\
             Application: {app}\n\
             Task: {task}\n\
             Screenshot size: {width}x{height} pixels.\n\n\
             Look at the screenshot and produce the exact steps to complete the task.\n\
             UI conventions to rely on:\n\
             - Search fields are usually at the top-right or top-center of the window.\n\
             - Play buttons appear next to or below search results.\n\
             - Prefer keyboard shortcuts when they exist: Ctrl+F or Cmd+F opens search,\n\
               Return submits, Space toggles playback.\n\
             - After typing in a search field, press Return before clicking results.\n\n\
             Respond with ONLY a JSON array of steps, no prose. Step forms:\n\
             {{\"type\": \"click\", \"x\": <int>, \"y\": <int>}}\n\
             {{\"type\": \"type\", \"text\": \"<string>\"}}\n\
             {{\"type\": \"key\", \"combo\": \"<e.g. Ctrl+F or Return>\"}}\n\
             {{\"type\": \"wait\", \"ms\": <int>}}\n\
             {{\"type\": \"scroll\", \"dx\": <int>, \"dy\": <int>}}"
        )
    }

    async fn call_api(&self, prompt: &str, image_base64: &str) -> Result<String, BackendError> {
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": prompt,
                    },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/png;base64,{image_base64}"),
                        },
                    },
                ],
            }],
            "max_tokens": 1024,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(BackendError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::InvalidResponse("missing message content".to_string()))
    }
}

#[async_trait]
impl PlanBackend for HttpPlanBackend {
    async fn plan(
        &self,
        app: &str,
        task: &str,
        screenshot: &Screenshot,
    ) -> Result<ActionPlan, BackendError> {
        let prompt = Self::build_prompt(app, task, screenshot.width(), screenshot.height());
        let image = screenshot.to_base64_png(MAX_IMAGE_DIMENSION)?;

        tracing::debug!(app, task, model = %self.model, "requesting action plan");
        let content = self.call_api(&prompt, &image).await?;
        let steps = parse_steps(&content)?;
        tracing::info!(app, task, steps = steps.len(), "received action plan");

        Ok(ActionPlan::new(app, task, steps))
    }
}

/// Mock backend for tests. Hands out a canned plan and counts calls.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct MockBackend {
        steps: Vec<PlanStep>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockBackend {
        pub fn with_steps(steps: Vec<PlanStep>) -> Self {
            Self {
                steps,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                steps: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlanBackend for MockBackend {
        async fn plan(
            &self,
            app: &str,
            task: &str,
            _screenshot: &Screenshot,
        ) -> Result<ActionPlan, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BackendError::InvalidResponse("mock failure".to_string()));
            }
            Ok(ActionPlan::new(app, task, self.steps.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_app_and_task() {
        let prompt = HttpPlanBackend::build_prompt("spotify", "play jazz", 1920, 1080);
        assert!(prompt.contains("spotify"));
        assert!(prompt.contains("play jazz"));
        assert!(prompt.contains("1920x1080"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn from_env_requires_key() {
        std::env::remove_var(API_KEY_ENV);
        assert!(matches!(
            HttpPlanBackend::from_env(),
            Err(BackendError::MissingApiKey)
        ));
    }
}
