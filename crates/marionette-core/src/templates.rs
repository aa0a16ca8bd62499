//! Tier 1: pre-authored automation templates.
//!
//! Each template is a complete script for one (action, app) pair on one
//! platform, with `{placeholder}` slots filled in at instantiation time.
//! macOS templates are AppleScript whose final expression evaluates to
//! `SUCCESS`; Linux templates are bash scripts that `echo SUCCESS`. The
//! executor requires that marker in stdout, so a script that ran but did
//! nothing does not count as success.

use std::collections::HashMap;

use marionette_platform::Platform;

use crate::script::ScriptKind;

/// A rendered, ready-to-run script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedScript {
    pub kind: ScriptKind,
    pub text: String,
}

impl RenderedScript {
    /// Whether any `{placeholder}` slot survived substitution. A rendered
    /// script with holes in it must never reach the shell.
    pub fn has_unresolved_placeholders(&self) -> bool {
        find_placeholder(&self.text).is_some()
    }

    /// The first unresolved placeholder name, for error messages.
    pub fn first_unresolved_placeholder(&self) -> Option<&str> {
        find_placeholder(&self.text)
    }
}

fn find_placeholder(text: &str) -> Option<&str> {
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let tail = &rest[start + 1..];
        let Some(end) = tail.find('}') else {
            return None;
        };
        let name = &tail[..end];
        if !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Some(name);
        }
        // A slot can sit inside literal braces, as in AppleScript
        // records: rescan from just past the opening brace so a
        // nested `{title}` is not jumped over.
        rest = tail;
    }
    None
}

struct Template {
    kind: ScriptKind,
    body: &'static str,
}

/// Per-platform set of scripted automations keyed by (action, app).
pub struct TemplateLibrary {
    platform: Platform,
    templates: HashMap<(&'static str, &'static str), Template>,
}

impl TemplateLibrary {
    /// Build the template set for a platform. Platforms without scripted
    /// coverage (Windows, mobile) get an empty library and rely on the
    /// other tiers.
    pub fn for_platform(platform: Platform) -> Self {
        let templates = match platform {
            Platform::MacOs => macos_templates(),
            Platform::Linux => linux_templates(),
            _ => HashMap::new(),
        };
        Self {
            platform,
            templates,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Whether a scripted template exists for this (action, app) pair.
    /// Both keys are expected pre-normalized (lowercase, underscores).
    pub fn has_template(&self, action: &str, app: &str) -> bool {
        self.templates.contains_key(&(action, app))
    }

    /// Render the template for (action, app), substituting `{name}` slots
    /// from `params` literally. Placeholders without a matching parameter
    /// are left verbatim; callers check
    /// [`RenderedScript::has_unresolved_placeholders`] before executing.
    pub fn instantiate(
        &self,
        action: &str,
        app: &str,
        params: &HashMap<String, String>,
    ) -> Option<RenderedScript> {
        let template = self.templates.get(&(action, app))?;
        let mut text = template.body.to_string();
        for (name, value) in params {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        Some(RenderedScript {
            kind: template.kind,
            text,
        })
    }

    /// The generic launch script for an arbitrary app, used by the last
    /// tier. Only platforms with a scripted launcher return one.
    pub fn launch_script(&self, app: &str) -> Option<RenderedScript> {
        let body = match self.platform {
            Platform::MacOs => MACOS_GENERIC_LAUNCH,
            _ => return None,
        };
        Some(RenderedScript {
            kind: ScriptKind::AppleScript,
            text: body.replace("{app}", app),
        })
    }
}

fn macos_templates() -> HashMap<(&'static str, &'static str), Template> {
    let apple = |body| Template {
        kind: ScriptKind::AppleScript,
        body,
    };
    HashMap::from([
        (("play", "spotify"), apple(MACOS_SPOTIFY_PLAY)),
        (("play", "apple_music"), apple(MACOS_APPLE_MUSIC_PLAY)),
        (("pause", "spotify"), apple(MACOS_SPOTIFY_PAUSE)),
        (("next", "spotify"), apple(MACOS_SPOTIFY_NEXT)),
        (("message", "whatsapp"), apple(MACOS_WHATSAPP_MESSAGE)),
        (("message", "telegram"), apple(MACOS_TELEGRAM_MESSAGE)),
        (("open_url", "chrome"), apple(MACOS_CHROME_OPEN_URL)),
        (("open_url", "safari"), apple(MACOS_SAFARI_OPEN_URL)),
        (("create_note", "notes"), apple(MACOS_NOTES_CREATE)),
    ])
}

fn linux_templates() -> HashMap<(&'static str, &'static str), Template> {
    let bash = |body| Template {
        kind: ScriptKind::Shell,
        body,
    };
    HashMap::from([
        (("play", "spotify"), bash(LINUX_SPOTIFY_PLAY)),
        (("pause", "spotify"), bash(LINUX_SPOTIFY_PAUSE)),
        (("open_url", "chrome"), bash(LINUX_CHROME_OPEN_URL)),
        (("open_url", "firefox"), bash(LINUX_FIREFOX_OPEN_URL)),
        (("message", "whatsapp"), bash(LINUX_WHATSAPP_MESSAGE)),
        (("message", "telegram"), bash(LINUX_TELEGRAM_MESSAGE)),
        (("open_file", "vscode"), bash(LINUX_VSCODE_OPEN_FILE)),
    ])
}

// ---------------------------------------------------------------------------
// macOS templates (AppleScript; final expression must evaluate to SUCCESS)
// ---------------------------------------------------------------------------

const MACOS_SPOTIFY_PLAY: &str = r#"
on playTrack(songName)
    tell application "Spotify"
        if not running then
            launch
            delay 2
        else
            activate
            delay 0.3
        end if
    end tell
    tell application "System Events"
        tell process "Spotify"
            repeat 20 times
                try
                    if exists text field 1 of window 1 then
                        set focused of text field 1 of window 1 to true
                        set value of text field 1 of window 1 to songName
                        delay 0.2
                        keystroke return
                        exit repeat
                    end if
                end try
                delay 0.5
            end repeat
        end tell
    end tell
end playTrack

playTrack("{song}")
"SUCCESS"
"#;

const MACOS_APPLE_MUSIC_PLAY: &str = r#"
on playTrack(songName)
    tell application "Music"
        if not running then
            launch
            delay 2
        else
            activate
            delay 0.3
        end if
    end tell
    tell application "System Events"
        tell process "Music"
            repeat 20 times
                try
                    if exists text field 1 of window 1 then
                        set focused of text field 1 of window 1 to true
                        set value of text field 1 of window 1 to songName
                        keystroke return
                        delay 0.3
                        keystroke return
                        exit repeat
                    end if
                end try
                delay 0.5
            end repeat
        end tell
    end tell
end playTrack

playTrack("{song}")
"SUCCESS"
"#;

const MACOS_SPOTIFY_PAUSE: &str = r#"
tell application "Spotify"
    if running then
        playpause
    end if
end tell
"SUCCESS"
"#;

const MACOS_SPOTIFY_NEXT: &str = r#"
tell application "Spotify"
    if running then
        next track
    end if
end tell
"SUCCESS"
"#;

const MACOS_WHATSAPP_MESSAGE: &str = r#"
on sendMessage(contactName, messageText)
    tell application "WhatsApp"
        if not running then
            launch
            delay 3
        else
            activate
            delay 0.3
        end if
    end tell
    tell application "System Events"
        tell process "WhatsApp"
            keystroke "f" using command down
            delay 0.3
            keystroke contactName
            delay 0.5
            keystroke return
            delay 0.5
            keystroke messageText
            delay 0.2
            keystroke return
        end tell
    end tell
end sendMessage

sendMessage("{contact}", "{message}")
"SUCCESS"
"#;

const MACOS_TELEGRAM_MESSAGE: &str = r#"
on sendMessage(contactName, messageText)
    tell application "Telegram"
        if not running then
            launch
            delay 3
        else
            activate
            delay 0.3
        end if
    end tell
    tell application "System Events"
        tell process "Telegram"
            keystroke "f" using command down
            delay 0.3
            keystroke contactName
            delay 0.5
            keystroke return
            delay 0.5
            keystroke messageText
            delay 0.2
            keystroke return
        end tell
    end tell
end sendMessage

sendMessage("{contact}", "{message}")
"SUCCESS"
"#;

const MACOS_CHROME_OPEN_URL: &str = r#"
tell application "Google Chrome"
    activate
    open location "{url}"
end tell
"SUCCESS"
"#;

const MACOS_SAFARI_OPEN_URL: &str = r#"
tell application "Safari"
    activate
    open location "{url}"
end tell
"SUCCESS"
"#;

const MACOS_NOTES_CREATE: &str = r#"
tell application "Notes"
    activate
    tell account "iCloud"
        make new note at folder "Notes" with properties {name:"{title}", body:"{content}"}
    end tell
end tell
"SUCCESS"
"#;

const MACOS_GENERIC_LAUNCH: &str = r#"
tell application "{app}"
    launch
    activate
end tell
"SUCCESS"
"#;

// ---------------------------------------------------------------------------
// Linux templates (bash; must echo SUCCESS)
// ---------------------------------------------------------------------------

const LINUX_SPOTIFY_PLAY: &str = r#"#!/bin/bash
if ! pgrep -x spotify > /dev/null; then
    spotify &
    timeout=30
    elapsed=0
    while [ $elapsed -lt $timeout ]; do
        sleep 0.5
        elapsed=$((elapsed + 1))
        if pgrep -x spotify > /dev/null; then
            sleep 2
            break
        fi
    done
fi

if pgrep -x spotify > /dev/null; then
    xdotool search --name "Spotify" windowactivate 2>/dev/null
    sleep 0.5
    xdotool key ctrl+l
    sleep 0.3
    xdotool type "{song}"
    sleep 0.2
    xdotool key Return
    echo "SUCCESS"
else
    echo "ERROR: Spotify not found"
fi
"#;

const LINUX_SPOTIFY_PAUSE: &str = r#"#!/bin/bash
dbus-send --print-reply --dest=org.mpris.MediaPlayer2.spotify \
    /org/mpris/MediaPlayer2 org.mpris.MediaPlayer2.Player.PlayPause 2>/dev/null

if [ $? -eq 0 ]; then
    echo "SUCCESS"
else
    xdotool key XF86AudioPlay
    echo "SUCCESS"
fi
"#;

const LINUX_CHROME_OPEN_URL: &str = r#"#!/bin/bash
if pgrep -x chrome > /dev/null || pgrep -x chromium > /dev/null; then
    google-chrome "{url}" 2>/dev/null || chromium "{url}" 2>/dev/null
else
    google-chrome "{url}" 2>/dev/null || chromium "{url}" 2>/dev/null &
fi
echo "SUCCESS"
"#;

const LINUX_FIREFOX_OPEN_URL: &str = r#"#!/bin/bash
if pgrep -x firefox > /dev/null; then
    firefox --new-tab "{url}" 2>/dev/null
else
    firefox "{url}" 2>/dev/null &
fi
echo "SUCCESS"
"#;

const LINUX_WHATSAPP_MESSAGE: &str = r#"#!/bin/bash
if ! pgrep -f whatsapp > /dev/null; then
    if [ -x "/usr/bin/whatsapp-desktop" ]; then
        whatsapp-desktop &
    else
        xdg-open "https://web.whatsapp.com" &
    fi
    sleep 3
fi

if pgrep -f whatsapp > /dev/null || pgrep -f chrome > /dev/null; then
    xdotool search --name "WhatsApp" windowactivate 2>/dev/null
    sleep 0.5
    xdotool key ctrl+f
    sleep 0.3
    xdotool type "{contact}"
    sleep 0.5
    xdotool key Return
    sleep 0.5
    xdotool type "{message}"
    sleep 0.2
    xdotool key Return
    echo "SUCCESS"
else
    echo "ERROR: WhatsApp not found"
fi
"#;

const LINUX_TELEGRAM_MESSAGE: &str = r#"#!/bin/bash
if ! pgrep -f telegram > /dev/null; then
    telegram-desktop &
    sleep 3
fi

if pgrep -f telegram > /dev/null; then
    xdotool search --name "Telegram" windowactivate
    sleep 0.5
    xdotool key ctrl+f
    sleep 0.3
    xdotool type "{contact}"
    sleep 0.5
    xdotool key Return
    sleep 0.5
    xdotool type "{message}"
    sleep 0.2
    xdotool key Return
    echo "SUCCESS"
else
    echo "ERROR: Telegram not found"
fi
"#;

const LINUX_VSCODE_OPEN_FILE: &str = r#"#!/bin/bash
if ! pgrep -x code > /dev/null; then
    code "{file}" &
else
    code "{file}"
fi
echo "SUCCESS"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn macos_library_knows_its_pairs() {
        let library = TemplateLibrary::for_platform(Platform::MacOs);
        assert!(library.has_template("play", "spotify"));
        assert!(library.has_template("message", "whatsapp"));
        assert!(!library.has_template("play", "winamp"));
    }

    #[test]
    fn mobile_library_is_empty() {
        let library = TemplateLibrary::for_platform(Platform::Android);
        assert!(library.is_empty());
        assert!(!library.has_template("play", "spotify"));
    }

    #[test]
    fn instantiation_substitutes_literally() {
        let library = TemplateLibrary::for_platform(Platform::Linux);
        let rendered = library
            .instantiate("play", "spotify", &params(&[("song", "Take Five")]))
            .unwrap();
        assert_eq!(rendered.kind, ScriptKind::Shell);
        assert!(rendered.text.contains("xdotool type \"Take Five\""));
        assert!(!rendered.has_unresolved_placeholders());
    }

    #[test]
    fn missing_params_are_left_verbatim() {
        let library = TemplateLibrary::for_platform(Platform::Linux);
        let rendered = library
            .instantiate("message", "whatsapp", &params(&[("contact", "James")]))
            .unwrap();
        assert!(rendered.text.contains("{message}"));
        assert!(rendered.has_unresolved_placeholders());
        assert_eq!(rendered.first_unresolved_placeholder(), Some("message"));
    }

    #[test]
    fn slot_inside_literal_braces_is_still_detected() {
        // The Notes record wraps its slots in AppleScript braces:
        // {name:"{title}", body:"{content}"}.
        let library = TemplateLibrary::for_platform(Platform::MacOs);
        let rendered = library
            .instantiate("create_note", "notes", &params(&[("content", "buy milk")]))
            .unwrap();
        assert!(rendered.has_unresolved_placeholders());
        assert_eq!(rendered.first_unresolved_placeholder(), Some("title"));

        let rendered = library
            .instantiate(
                "create_note",
                "notes",
                &params(&[("title", "errands"), ("content", "buy milk")]),
            )
            .unwrap();
        assert!(!rendered.has_unresolved_placeholders());
    }

    #[test]
    fn shell_syntax_is_not_mistaken_for_placeholders() {
        let library = TemplateLibrary::for_platform(Platform::Linux);
        let rendered = library
            .instantiate("pause", "spotify", &HashMap::new())
            .unwrap();
        // No placeholder slots at all; the bash bits must not trip the scan.
        assert!(!rendered.has_unresolved_placeholders());
    }

    #[test]
    fn success_marker_present_in_all_templates() {
        for platform in [Platform::MacOs, Platform::Linux] {
            let library = TemplateLibrary::for_platform(platform);
            for ((action, app), template) in &library.templates {
                assert!(
                    template.body.contains("SUCCESS"),
                    "{platform} template ({action}, {app}) lacks a SUCCESS marker"
                );
            }
        }
    }

    #[test]
    fn generic_launch_only_on_macos() {
        let macos = TemplateLibrary::for_platform(Platform::MacOs);
        let rendered = macos.launch_script("calculator").unwrap();
        assert!(rendered.text.contains("\"calculator\""));

        assert!(TemplateLibrary::for_platform(Platform::Linux)
            .launch_script("calculator")
            .is_none());
    }
}
