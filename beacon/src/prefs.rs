//! Persisted operator preferences

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use morse_core::TimingConfig;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Default unit period in milliseconds
pub const DEFAULT_SPEED_MS: f64 = 100.0;
/// Default loop delay in milliseconds
pub const DEFAULT_LOOP_MS: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("cannot write preferences: {0}")]
    Io(#[from] io::Error),

    #[error("cannot encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Stored `{ "speed": <ms>, "loop": <ms> }` document
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preferences {
    /// Unit period in milliseconds
    pub speed: f64,
    /// Loop delay in milliseconds
    #[serde(rename = "loop")]
    pub loop_ms: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED_MS,
            loop_ms: DEFAULT_LOOP_MS,
        }
    }
}

impl Preferences {
    /// `<config dir>/morse-beacon/prefs.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("morse-beacon").join("prefs.json"))
    }

    /// Load from `path`, falling back to defaults field by field.
    ///
    /// Never fails: a missing file, bad JSON or a non-numeric field just
    /// yields the default for that field.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "no preferences, using defaults");
                Self::default()
            }
        }
    }

    /// Parse a stored document with per-field fallback
    pub fn parse(text: &str) -> Self {
        let mut prefs = Self::default();
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%err, "malformed preferences, using defaults");
                return prefs;
            }
        };

        if let Some(speed) = number_field(&value, "speed") {
            prefs.speed = speed;
        }
        if let Some(loop_ms) = number_field(&value, "loop") {
            prefs.loop_ms = loop_ms;
        }
        tracing::debug!(speed = prefs.speed, loop_ms = prefs.loop_ms, "preferences loaded");
        prefs
    }

    pub fn save(&self, path: &Path) -> Result<(), PrefsError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Scales for the emitter: `round(speed / 100)`, `round(loop / 1000)`
    pub fn timing(&self) -> TimingConfig {
        TimingConfig::from_millis(self.speed, self.loop_ms)
    }

    pub fn from_timing(config: TimingConfig) -> Self {
        Self {
            speed: config.speed_ms() as f64,
            loop_ms: config.loop_ms() as f64,
        }
    }
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}
