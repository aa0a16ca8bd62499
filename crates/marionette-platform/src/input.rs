//! Primitive input synthesis.
//!
//! Five primitives are all the plan executor needs: move, click, type,
//! key combo, scroll. The real backend is `enigo` behind the
//! `gui-automation` feature; the mock records every call for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{InputError, InputResult};

/// Mouse buttons the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier keys, normalized across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Shift,
    Control,
    Alt,
    Meta,
}

impl Modifier {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "shift" => Some(Self::Shift),
            "ctrl" | "control" => Some(Self::Control),
            "alt" | "option" | "opt" => Some(Self::Alt),
            "cmd" | "meta" | "super" | "win" => Some(Self::Meta),
            _ => None,
        }
    }
}

/// A parsed key combination such as `Ctrl+Shift+S` or a bare `Return`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    pub modifiers: Vec<Modifier>,
    /// The non-modifier key: a single character or a named key like
    /// `return`, `space`, `escape`, `f5`.
    pub key: String,
}

impl KeyCombo {
    /// Parse a combo from its textual form. Tokens are separated by `+`;
    /// every token but the last must be a modifier.
    pub fn parse(text: &str) -> InputResult<Self> {
        let tokens: Vec<String> = text
            .split('+')
            .map(|token| token.trim().to_lowercase())
            .filter(|token| !token.is_empty())
            .collect();
        let Some((key, modifier_tokens)) = tokens.split_last() else {
            return Err(InputError::InvalidCombo(text.to_string()));
        };

        let mut modifiers = Vec::with_capacity(modifier_tokens.len());
        for token in modifier_tokens {
            let modifier = Modifier::parse(token)
                .ok_or_else(|| InputError::InvalidCombo(text.to_string()))?;
            modifiers.push(modifier);
        }
        Ok(Self {
            modifiers,
            key: key.clone(),
        })
    }
}

impl std::fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for modifier in &self.modifiers {
            let name = match modifier {
                Modifier::Shift => "Shift",
                Modifier::Control => "Ctrl",
                Modifier::Alt => "Alt",
                Modifier::Meta => "Cmd",
            };
            write!(f, "{name}+")?;
        }
        f.write_str(&self.key)
    }
}

/// Input synthesis seam. Implementations must be safe to share across
/// tasks; the engine holds one driver for its lifetime.
#[async_trait]
pub trait InputDriver: Send + Sync {
    /// Whether synthesis can actually reach a display.
    fn is_available(&self) -> bool;

    async fn move_mouse(&self, x: i32, y: i32) -> InputResult<()>;

    /// Move to `(x, y)` then click.
    async fn click(&self, x: i32, y: i32, button: MouseButton) -> InputResult<()>;

    async fn type_text(&self, text: &str) -> InputResult<()>;

    async fn press_key(&self, combo: &KeyCombo) -> InputResult<()>;

    async fn scroll(&self, dx: i32, dy: i32) -> InputResult<()>;
}

#[cfg(feature = "gui-automation")]
pub mod platform {
    use super::*;
    use enigo::{
        Button, Coordinate, Direction, Enigo, Key as EnigoKey, Keyboard, Mouse, Settings,
    };
    use std::sync::Mutex as StdMutex;

    /// Enigo-backed driver. Enigo itself is not `Sync`, so calls take a
    /// short-lived mutex; synthesis is serialized anyway.
    pub struct EnigoDriver {
        enigo: StdMutex<Enigo>,
    }

    impl EnigoDriver {
        pub fn new() -> InputResult<Self> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| InputError::NotAvailable(e.to_string()))?;
            Ok(Self {
                enigo: StdMutex::new(enigo),
            })
        }

        fn convert_key(name: &str) -> InputResult<EnigoKey> {
            let mut chars = name.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Ok(EnigoKey::Unicode(c));
            }
            match name {
                "return" | "enter" => Ok(EnigoKey::Return),
                "space" => Ok(EnigoKey::Space),
                "tab" => Ok(EnigoKey::Tab),
                "escape" | "esc" => Ok(EnigoKey::Escape),
                "backspace" => Ok(EnigoKey::Backspace),
                "delete" => Ok(EnigoKey::Delete),
                "up" => Ok(EnigoKey::UpArrow),
                "down" => Ok(EnigoKey::DownArrow),
                "left" => Ok(EnigoKey::LeftArrow),
                "right" => Ok(EnigoKey::RightArrow),
                "home" => Ok(EnigoKey::Home),
                "end" => Ok(EnigoKey::End),
                "pageup" => Ok(EnigoKey::PageUp),
                "pagedown" => Ok(EnigoKey::PageDown),
                "f1" => Ok(EnigoKey::F1),
                "f2" => Ok(EnigoKey::F2),
                "f3" => Ok(EnigoKey::F3),
                "f4" => Ok(EnigoKey::F4),
                "f5" => Ok(EnigoKey::F5),
                "f6" => Ok(EnigoKey::F6),
                "f7" => Ok(EnigoKey::F7),
                "f8" => Ok(EnigoKey::F8),
                "f9" => Ok(EnigoKey::F9),
                "f10" => Ok(EnigoKey::F10),
                "f11" => Ok(EnigoKey::F11),
                "f12" => Ok(EnigoKey::F12),
                other => Err(InputError::InvalidCombo(other.to_string())),
            }
        }

        fn convert_modifier(modifier: Modifier) -> EnigoKey {
            match modifier {
                Modifier::Shift => EnigoKey::Shift,
                Modifier::Control => EnigoKey::Control,
                Modifier::Alt => EnigoKey::Alt,
                Modifier::Meta => EnigoKey::Meta,
            }
        }

        fn convert_button(button: MouseButton) -> Button {
            match button {
                MouseButton::Left => Button::Left,
                MouseButton::Right => Button::Right,
                MouseButton::Middle => Button::Middle,
            }
        }

        fn lock(&self) -> InputResult<std::sync::MutexGuard<'_, Enigo>> {
            self.enigo
                .lock()
                .map_err(|e| InputError::Synthesis(format!("failed to lock enigo: {e}")))
        }
    }

    #[async_trait]
    impl InputDriver for EnigoDriver {
        fn is_available(&self) -> bool {
            true
        }

        async fn move_mouse(&self, x: i32, y: i32) -> InputResult<()> {
            self.lock()?
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(|e| InputError::Synthesis(e.to_string()))
        }

        async fn click(&self, x: i32, y: i32, button: MouseButton) -> InputResult<()> {
            self.move_mouse(x, y).await?;
            self.lock()?
                .button(Self::convert_button(button), Direction::Click)
                .map_err(|e| InputError::Synthesis(e.to_string()))
        }

        async fn type_text(&self, text: &str) -> InputResult<()> {
            self.lock()?
                .text(text)
                .map_err(|e| InputError::Synthesis(e.to_string()))
        }

        async fn press_key(&self, combo: &KeyCombo) -> InputResult<()> {
            let main_key = Self::convert_key(&combo.key)?;
            let mut enigo = self.lock()?;

            for modifier in &combo.modifiers {
                enigo
                    .key(Self::convert_modifier(*modifier), Direction::Press)
                    .map_err(|e| InputError::Synthesis(e.to_string()))?;
            }
            enigo
                .key(main_key, Direction::Click)
                .map_err(|e| InputError::Synthesis(e.to_string()))?;
            for modifier in combo.modifiers.iter().rev() {
                enigo
                    .key(Self::convert_modifier(*modifier), Direction::Release)
                    .map_err(|e| InputError::Synthesis(e.to_string()))?;
            }
            Ok(())
        }

        async fn scroll(&self, dx: i32, dy: i32) -> InputResult<()> {
            let mut enigo = self.lock()?;
            if dy != 0 {
                enigo
                    .scroll(dy, enigo::Axis::Vertical)
                    .map_err(|e| InputError::Synthesis(e.to_string()))?;
            }
            if dx != 0 {
                enigo
                    .scroll(dx, enigo::Axis::Horizontal)
                    .map_err(|e| InputError::Synthesis(e.to_string()))?;
            }
            Ok(())
        }
    }
}

/// Create the default driver for this build.
#[cfg(feature = "gui-automation")]
pub fn create_input_driver() -> InputResult<impl InputDriver> {
    platform::EnigoDriver::new()
}

#[cfg(not(feature = "gui-automation"))]
pub fn create_input_driver() -> InputResult<impl InputDriver> {
    Ok(mock::MockDriver::new())
}

/// Mock driver for tests. Always present, feature or not.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// One recorded synthesis call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedInput {
        Move { x: i32, y: i32 },
        Click { x: i32, y: i32, button: MouseButton },
        Text(String),
        Key(KeyCombo),
        Scroll { dx: i32, dy: i32 },
    }

    /// Records every call; optionally fails everything after a set point
    /// so executors' failure paths can be tested.
    #[derive(Debug, Default)]
    pub struct MockDriver {
        recorded: Mutex<Vec<RecordedInput>>,
        fail_after: Option<usize>,
    }

    impl MockDriver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Succeed for the first `n` calls, fail afterwards.
        pub fn failing_after(n: usize) -> Self {
            Self {
                recorded: Mutex::new(Vec::new()),
                fail_after: Some(n),
            }
        }

        pub fn recorded(&self) -> Vec<RecordedInput> {
            self.recorded.lock().unwrap().clone()
        }

        fn record(&self, input: RecordedInput) -> InputResult<()> {
            let mut recorded = self.recorded.lock().unwrap();
            if let Some(limit) = self.fail_after {
                if recorded.len() >= limit {
                    return Err(InputError::Synthesis("mock failure".into()));
                }
            }
            recorded.push(input);
            Ok(())
        }
    }

    #[async_trait]
    impl InputDriver for MockDriver {
        fn is_available(&self) -> bool {
            true
        }

        async fn move_mouse(&self, x: i32, y: i32) -> InputResult<()> {
            self.record(RecordedInput::Move { x, y })
        }

        async fn click(&self, x: i32, y: i32, button: MouseButton) -> InputResult<()> {
            self.record(RecordedInput::Click { x, y, button })
        }

        async fn type_text(&self, text: &str) -> InputResult<()> {
            self.record(RecordedInput::Text(text.to_string()))
        }

        async fn press_key(&self, combo: &KeyCombo) -> InputResult<()> {
            self.record(RecordedInput::Key(combo.clone()))
        }

        async fn scroll(&self, dx: i32, dy: i32) -> InputResult<()> {
            self.record(RecordedInput::Scroll { dx, dy })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockDriver, RecordedInput};
    use super::*;

    #[test]
    fn combo_parsing() {
        let combo = KeyCombo::parse("Ctrl+Shift+S").unwrap();
        assert_eq!(combo.modifiers, vec![Modifier::Control, Modifier::Shift]);
        assert_eq!(combo.key, "s");

        let bare = KeyCombo::parse("Return").unwrap();
        assert!(bare.modifiers.is_empty());
        assert_eq!(bare.key, "return");

        let mac = KeyCombo::parse("cmd+f").unwrap();
        assert_eq!(mac.modifiers, vec![Modifier::Meta]);
        assert_eq!(mac.key, "f");
    }

    #[test]
    fn combo_rejects_garbage() {
        assert!(KeyCombo::parse("").is_err());
        assert!(KeyCombo::parse("bogus+s").is_err());
        assert!(KeyCombo::parse("+++").is_err());
    }

    #[test]
    fn combo_display_round_trips() {
        let combo = KeyCombo::parse("ctrl+shift+s").unwrap();
        let reparsed = KeyCombo::parse(&combo.to_string()).unwrap();
        assert_eq!(combo, reparsed);
    }

    #[tokio::test]
    async fn mock_driver_records_calls() {
        let driver = MockDriver::new();
        driver.click(10, 20, MouseButton::Left).await.unwrap();
        driver.type_text("hello").await.unwrap();
        driver.scroll(0, -3).await.unwrap();

        let recorded = driver.recorded();
        assert_eq!(recorded.len(), 3);
        assert_eq!(
            recorded[0],
            RecordedInput::Click {
                x: 10,
                y: 20,
                button: MouseButton::Left
            }
        );
        assert_eq!(recorded[1], RecordedInput::Text("hello".into()));
    }

    #[tokio::test]
    async fn mock_driver_fails_after_limit() {
        let driver = MockDriver::failing_after(1);
        driver.move_mouse(0, 0).await.unwrap();
        assert!(driver.move_mouse(1, 1).await.is_err());
    }
}
