//! Intent router: pattern-based classification of free-text requests.
//!
//! A request either matches a tool with enough confidence to act on
//! locally, or it does not — in which case the caller hands it to
//! whatever heavier path sits behind the router. Classification never
//! errors; the worst case is "no tool, zero confidence".
//!
//! Matching is deliberately simple: case-insensitive substring patterns
//! with a per-tool confidence boost on a 0.6 base. Registration order is
//! significant — on equal confidence the first-registered tool wins, so
//! the default registry is a `Vec`, not a map.

use std::collections::HashMap;

/// Base confidence for any pattern hit.
pub const BASE_CONFIDENCE: f64 = 0.6;

/// Default minimum confidence to act locally.
pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// Router policy knobs.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Matches below this confidence classify as no tool.
    pub threshold: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Extracted parameters, keyed by name. Values are kept as strings;
/// numeric parameters (timer seconds, volume) are rendered decimal.
pub type Params = HashMap<String, String>;

/// Which extraction heuristic a tool uses on the matched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    AppName,
    Query,
    SongInfo,
    VolumeLevel,
    Expression,
    Url,
    ContactName,
    MessageInfo,
    Duration,
    FileName,
    FolderName,
    NoteInfo,
    Word,
}

/// One registered tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub patterns: &'static [&'static str],
    pub boost: f64,
    pub param: Option<ParamKind>,
}

/// Result of classifying one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// `None` when nothing matched above the threshold.
    pub tool: Option<String>,
    pub confidence: f64,
    pub params: Params,
}

impl Classification {
    fn none() -> Self {
        Self {
            tool: None,
            confidence: 0.0,
            params: Params::new(),
        }
    }
}

/// The router itself: an ordered tool registry plus a threshold.
pub struct IntentRouter {
    tools: Vec<ToolDescriptor>,
    config: RouterConfig,
}

impl IntentRouter {
    /// An empty router. Mostly useful in tests.
    pub fn new(config: RouterConfig) -> Self {
        Self {
            tools: Vec::new(),
            config,
        }
    }

    /// The standard tool registry.
    pub fn with_defaults() -> Self {
        let mut router = Self::new(RouterConfig::default());
        for tool in default_tools() {
            router.register(tool);
        }
        router
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a tool. Earlier registrations win confidence ties.
    pub fn register(&mut self, tool: ToolDescriptor) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Classify free text. Empty input is a valid "no match", never an
    /// error.
    pub fn classify(&self, input: &str) -> Classification {
        let text = input.trim();
        if text.is_empty() {
            return Classification::none();
        }
        let lower = text.to_lowercase();

        let mut best: Option<(&ToolDescriptor, f64)> = None;
        for tool in &self.tools {
            if !tool.patterns.iter().any(|pattern| lower.contains(pattern)) {
                continue;
            }
            let confidence = (BASE_CONFIDENCE + tool.boost).min(1.0);
            // Strict comparison: the first-registered tool keeps a tie.
            if best.map_or(true, |(_, c)| confidence > c) {
                best = Some((tool, confidence));
            }
        }

        let Some((tool, confidence)) = best else {
            return Classification::none();
        };
        if confidence < self.config.threshold {
            tracing::debug!(input = text, tool = tool.name, confidence, "below threshold");
            return Classification::none();
        }

        let params = tool
            .param
            .map(|kind| extract_params(kind, text, &lower))
            .unwrap_or_default();

        tracing::debug!(input = text, tool = tool.name, confidence, "classified");
        Classification {
            tool: Some(tool.name.to_string()),
            confidence,
            params,
        }
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_tools() -> Vec<ToolDescriptor> {
    macro_rules! tool {
        ($name:literal, $boost:literal, [$($p:literal),+]) => {
            ToolDescriptor { name: $name, patterns: &[$($p),+], boost: $boost, param: None }
        };
        ($name:literal, $boost:literal, [$($p:literal),+], $kind:expr) => {
            ToolDescriptor { name: $name, patterns: &[$($p),+], boost: $boost, param: Some($kind) }
        };
    }

    vec![
        // Time & date
        tool!("getTime", 0.3, ["what time", "current time", "time is it", "tell me the time"]),
        tool!("getDate", 0.3, ["what date", "today's date", "what day", "current date"]),
        // Apps & system
        tool!("openApp", 0.2, ["open", "launch", "start"], ParamKind::AppName),
        tool!("controlSystem", 0.25, ["brightness", "mute", "unmute"]),
        // Media
        tool!("playMusic", 0.25, ["play", "play music", "play song"], ParamKind::SongInfo),
        tool!("pauseMedia", 0.3, ["pause", "stop playing", "pause music", "pause video"]),
        tool!("nextTrack", 0.3, ["next song", "skip", "next track", "skip song"]),
        tool!("previousTrack", 0.3, ["previous song", "go back", "previous track", "last song"]),
        tool!("setVolume", 0.25, ["volume", "set volume", "volume to", "volume at"], ParamKind::VolumeLevel),
        // Quick actions
        tool!("takeScreenshot", 0.35, ["screenshot", "take screenshot", "capture screen", "screen capture"]),
        tool!("calculator", 0.2, ["calculate", "what is", "how much is", "compute"], ParamKind::Expression),
        tool!("openUrl", 0.2, ["go to", "navigate to", "open website"], ParamKind::Url),
        tool!("searchWeb", 0.2, ["search for", "google", "look up", "find information"], ParamKind::Query),
        // Information
        tool!("getWeather", 0.3, ["weather", "temperature", "forecast", "how's the weather"]),
        tool!("getBattery", 0.3, ["battery", "battery level", "power left"]),
        // Communication
        tool!("callContact", 0.25, ["call", "phone", "dial"], ParamKind::ContactName),
        tool!("messageContact", 0.2, ["message", "text", "send message", "send text"], ParamKind::MessageInfo),
        // System security
        tool!("lockScreen", 0.35, ["lock screen", "lock computer", "lock my screen", "lock this"]),
        tool!("sleep", 0.3, ["sleep", "put to sleep", "sleep mode", "sleep computer"]),
        // Time management
        tool!("setTimer", 0.35, ["set timer", "timer for", "start timer", "countdown"], ParamKind::Duration),
        tool!("setAlarm", 0.3, ["set alarm", "alarm for", "wake me", "alarm at"]),
        // Files
        tool!("openFile", 0.25, ["open file", "show file", "open document"], ParamKind::FileName),
        tool!("createFolder", 0.3, ["create folder", "new folder", "make folder", "make directory"], ParamKind::FolderName),
        tool!("deleteFile", 0.2, ["delete file", "remove file", "trash file"], ParamKind::FileName),
        tool!("createNote", 0.3, ["create note", "new note", "make a note", "take a note"], ParamKind::NoteInfo),
        // Language
        tool!("defineWord", 0.2, ["define", "definition of", "what does", "meaning of"], ParamKind::Word),
        // Advanced system
        tool!("restart", 0.35, ["restart", "reboot", "restart computer"]),
        tool!("shutdown", 0.35, ["shutdown", "shut down", "turn off computer", "power off"]),
        tool!("closeApp", 0.2, ["close", "quit", "exit", "kill"], ParamKind::AppName),
        tool!("checkPermissions", 0.3, ["check permissions", "permission status", "am i allowed"]),
        tool!("listApps", 0.3, ["list apps", "installed apps", "what apps", "which apps"]),
    ]
}

// ---------------------------------------------------------------------------
// Parameter extraction heuristics
// ---------------------------------------------------------------------------

/// The original-case text after the first occurrence of `trigger` in the
/// lowercased text.
fn after<'a>(text: &'a str, lower: &str, trigger: &str) -> Option<&'a str> {
    let pos = lower.find(trigger)?;
    Some(text[pos + trigger.len()..].trim())
}

fn extract_params(kind: ParamKind, text: &str, lower: &str) -> Params {
    let mut params = Params::new();
    match kind {
        ParamKind::AppName => {
            for trigger in ["open", "launch", "start"] {
                if let Some(rest) = after(text, lower, trigger) {
                    if let Some(app) = rest.split_whitespace().next() {
                        let app = app.trim_matches(|c: char| !c.is_alphanumeric());
                        if !app.is_empty() {
                            params.insert("appName".into(), app.to_lowercase());
                            break;
                        }
                    }
                }
            }
        }
        ParamKind::Query => {
            let engine = if lower.contains("bing") {
                "bing"
            } else if lower.contains("duckduckgo") || lower.contains("duck duck go") {
                "duckduckgo"
            } else {
                "google"
            };
            for trigger in ["search for", "google", "bing", "look up", "find information about"] {
                if let Some(rest) = after(text, lower, trigger) {
                    let query = rest
                        .replace("on google", "")
                        .replace("on bing", "")
                        .replace("on duckduckgo", "")
                        .trim()
                        .to_string();
                    if !query.is_empty() {
                        params.insert("query".into(), query);
                        params.insert("engine".into(), engine.into());
                        break;
                    }
                }
            }
        }
        ParamKind::SongInfo => {
            if let Some(rest) = after(text, lower, "play") {
                let mut song = rest.to_string();
                let mut app = None;
                for (name, keywords) in [
                    ("spotify", &["on spotify", "in spotify", "spotify"][..]),
                    ("apple_music", &["on apple music", "in apple music", "apple music"][..]),
                    ("youtube", &["on youtube", "youtube music", "youtube"][..]),
                ] {
                    for keyword in keywords {
                        if lower.contains(keyword) {
                            app = Some(name);
                            song = remove_ignore_case(&song, keyword);
                            break;
                        }
                    }
                    if app.is_some() {
                        break;
                    }
                }
                let song = remove_ignore_case(&remove_ignore_case(&song, "music"), "song")
                    .trim()
                    .to_string();
                if !song.is_empty() {
                    params.insert("songInfo".into(), song);
                    params.insert("app".into(), app.unwrap_or("spotify").into());
                }
            }
        }
        ParamKind::VolumeLevel => {
            if let Some(number) = first_number(lower) {
                params.insert("volumeLevel".into(), number.to_string());
            } else if lower.contains("up") {
                params.insert("volumeLevel".into(), "UP".into());
            } else if lower.contains("down") {
                params.insert("volumeLevel".into(), "DOWN".into());
            }
        }
        ParamKind::Expression => {
            for trigger in ["calculate", "what is", "how much is", "compute"] {
                if let Some(rest) = after(text, lower, trigger) {
                    let expression = rest.trim_end_matches('?').trim();
                    if !expression.is_empty() {
                        params.insert("expression".into(), expression.to_string());
                        break;
                    }
                }
            }
        }
        ParamKind::Url => {
            for trigger in ["go to", "navigate to", "open website"] {
                if let Some(rest) = after(text, lower, trigger) {
                    if rest.is_empty() {
                        continue;
                    }
                    let mut url = rest.to_string();
                    let mut browser = "default";
                    for name in ["chrome", "safari", "firefox", "edge"] {
                        if lower.contains(&format!("in {name}")) || lower.contains(&format!("on {name}")) {
                            browser = name;
                            url = remove_ignore_case(&url, &format!("in {name}"));
                            url = remove_ignore_case(&url, &format!("on {name}"));
                            break;
                        }
                    }
                    let mut url = url.trim().to_lowercase();
                    if url.is_empty() {
                        continue;
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        if !url.contains('.') {
                            url.push_str(".com");
                        }
                        url = format!("https://{url}");
                    }
                    params.insert("url".into(), url);
                    params.insert("browser".into(), browser.into());
                    break;
                }
            }
        }
        ParamKind::ContactName => {
            for trigger in ["call", "phone", "dial"] {
                if let Some(rest) = after(text, lower, trigger) {
                    let mut contact = rest.to_string();
                    let mut app = "phone";
                    for name in ["whatsapp", "facetime", "zoom", "telegram"] {
                        if lower.contains(name) {
                            app = name;
                            contact = remove_ignore_case(&contact, &format!("on {name}"));
                            contact = remove_ignore_case(&contact, name);
                            break;
                        }
                    }
                    let contact = contact.trim();
                    if !contact.is_empty() {
                        params.insert("contactName".into(), contact.to_string());
                        params.insert("app".into(), app.into());
                        break;
                    }
                }
            }
        }
        ParamKind::MessageInfo => {
            for trigger in ["message", "text", "send message to", "send text to"] {
                if let Some(rest) = after(text, lower, trigger) {
                    let mut info = rest.to_string();
                    let mut app = "whatsapp";
                    for name in ["telegram", "discord", "imessage", "whatsapp"] {
                        if lower.contains(name) {
                            app = name;
                            info = remove_ignore_case(&info, &format!("on {name}"));
                            info = remove_ignore_case(&info, name);
                            break;
                        }
                    }
                    let info = info.trim();
                    if info.is_empty() {
                        continue;
                    }
                    // "James that I'll be late" -> contact + content
                    if let Some((contact, message)) = info.split_once(" that ") {
                        params.insert("contactName".into(), contact.trim().to_string());
                        params.insert("message".into(), message.trim().to_string());
                    } else {
                        params.insert("contactName".into(), info.to_string());
                    }
                    params.insert("app".into(), app.into());
                    break;
                }
            }
        }
        ParamKind::Duration => {
            if let Some((value, unit)) = duration_tokens(lower) {
                let seconds = match unit {
                    "sec" | "second" => value,
                    "min" | "minute" => value * 60,
                    _ => value * 3600,
                };
                params.insert("seconds".into(), seconds.to_string());
                params.insert("duration".into(), format!("{value} {unit}s"));
            }
        }
        ParamKind::FileName => {
            for trigger in ["open file", "show file", "open document", "delete file", "remove file", "trash file"] {
                if let Some(rest) = after(text, lower, trigger) {
                    if !rest.is_empty() {
                        params.insert("fileName".into(), rest.to_string());
                        break;
                    }
                }
            }
        }
        ParamKind::FolderName => {
            for trigger in ["create folder", "new folder", "make folder", "make directory"] {
                if let Some(rest) = after(text, lower, trigger) {
                    if !rest.is_empty() {
                        params.insert("folderName".into(), rest.to_string());
                        break;
                    }
                }
            }
        }
        ParamKind::NoteInfo => {
            for trigger in ["create note", "new note", "make a note", "take a note"] {
                if let Some(rest) = after(text, lower, trigger) {
                    let rest = rest.trim_start_matches(':').trim();
                    let content = rest
                        .strip_prefix("that ")
                        .or_else(|| rest.strip_prefix("about "))
                        .or_else(|| rest.strip_prefix("saying "))
                        .unwrap_or(rest)
                        .trim();
                    if content.is_empty() {
                        continue;
                    }
                    // The first few words double as the note title.
                    let title: Vec<&str> = content.split_whitespace().take(6).collect();
                    params.insert("title".into(), title.join(" "));
                    params.insert("content".into(), content.to_string());
                    break;
                }
            }
        }
        ParamKind::Word => {
            for trigger in ["define", "definition of", "what does", "meaning of"] {
                if let Some(rest) = after(text, lower, trigger) {
                    let word = rest.trim_end_matches('?').trim();
                    let word = word.strip_suffix(" mean").unwrap_or(word).trim();
                    if !word.is_empty() {
                        params.insert("word".into(), word.to_string());
                        break;
                    }
                }
            }
        }
    }
    params
}

fn remove_ignore_case(text: &str, needle: &str) -> String {
    let lower = text.to_lowercase();
    match lower.find(&needle.to_lowercase()) {
        Some(pos) => {
            let mut out = String::with_capacity(text.len());
            out.push_str(text[..pos].trim_end());
            out.push(' ');
            out.push_str(text[pos + needle.len()..].trim_start());
            out.trim().to_string()
        }
        None => text.to_string(),
    }
}

fn first_number(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Find "5 minutes" / "30 sec" / "2 hours" shapes.
fn duration_tokens(lower: &str) -> Option<(u64, &'static str)> {
    const UNITS: &[(&str, &str)] = &[
        ("seconds", "second"),
        ("second", "second"),
        ("secs", "sec"),
        ("sec", "sec"),
        ("minutes", "minute"),
        ("minute", "minute"),
        ("mins", "min"),
        ("min", "min"),
        ("hours", "hour"),
        ("hour", "hour"),
        ("hrs", "hr"),
        ("hr", "hr"),
    ];

    let tokens: Vec<&str> = lower.split_whitespace().collect();
    for (i, token) in tokens.iter().enumerate() {
        let Ok(value) = token.parse::<u64>() else {
            continue;
        };
        if let Some(next_token) = tokens.get(i + 1) {
            for (pattern, canonical) in UNITS {
                if next_token.starts_with(pattern) {
                    return Some((value, canonical));
                }
            }
        }
    }
    None
}
