use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

use crate::{optimize::DEFAULT_MODEL, session::Mode, text::DEFAULT_SAMPLE_WORDS};

pub const DEFAULT_BG: &str = "#323437";
pub const DEFAULT_ACCENT: &str = "#5d8a66";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub default_mode: Mode,
    pub use_ai_optimization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub bg_primary: String,
    pub accent: String,
    pub sample_words: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_mode: Mode::Sixty,
            use_ai_optimization: false,
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            bg_primary: DEFAULT_BG.to_string(),
            accent: DEFAULT_ACCENT.to_string(),
            sample_words: DEFAULT_SAMPLE_WORDS,
        }
    }
}

/// Partial update; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub default_mode: Option<Mode>,
    pub use_ai_optimization: Option<bool>,
    pub openai_api_key: Option<String>,
    pub bg_primary: Option<String>,
    pub accent: Option<String>,
    pub sample_words: Option<usize>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Settings {
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(mode) = update.default_mode {
            self.default_mode = mode;
        }
        if let Some(ai) = update.use_ai_optimization {
            self.use_ai_optimization = ai;
        }
        if let Some(key) = update.openai_api_key {
            self.openai_api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        if let Some(bg) = update.bg_primary {
            self.bg_primary = bg;
        }
        if let Some(accent) = update.accent {
            self.accent = accent;
        }
        if let Some(n) = update.sample_words {
            self.sample_words = n.max(1);
        }
    }

    /// Stored key first, then the environment.
    pub fn api_key(&self) -> Option<String> {
        self.openai_api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn theme(&self) -> Theme {
        Theme {
            bg: parse_color(&self.bg_primary, DEFAULT_BG),
            accent: parse_color(&self.accent, DEFAULT_ACCENT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub bg: Color,
    pub accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Settings::default().theme()
    }
}

fn parse_color(value: &str, fallback: &str) -> Color {
    Color::from_str(value.trim())
        .or_else(|_| Color::from_str(fallback))
        .unwrap_or(Color::Reset)
}

pub trait SettingsStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(mut settings) = serde_json::from_slice::<Settings>(&bytes) {
                settings.sample_words = settings.sample_words.max(1);
                return settings;
            }
        }
        Settings::default()
    }

    fn save(&self, settings: &Settings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}
