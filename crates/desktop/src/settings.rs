use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use threatwatch_core::annotation::infrastructure::overlay_annotator::{
    OverlayStyle, DEFAULT_ALPHA,
};
use threatwatch_core::threat::domain::threat_policy::{
    ThreatPolicy, DEFAULT_EXTENSION, DEFAULT_WEAPON_CONFIDENCE,
};

/// User preferences read from a JSON file in the platform config directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub weapon_confidence: f32,
    pub extension: i32,
    pub dedupe: bool,
    pub alpha: f32,
    /// Overrides the cached or bundled model when set.
    pub model_path: Option<PathBuf>,
    /// Fetched into the cache when no local model exists.
    pub model_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weapon_confidence: DEFAULT_WEAPON_CONFIDENCE,
            extension: DEFAULT_EXTENSION,
            dedupe: false,
            alpha: DEFAULT_ALPHA,
            model_path: None,
            model_url: None,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Threatwatch").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing, unreadable or malformed files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str::<Settings>(&json).ok())
            .map(Settings::sanitized)
            .unwrap_or_default()
    }

    pub fn policy(&self) -> ThreatPolicy {
        ThreatPolicy {
            weapon_confidence: self.weapon_confidence,
            extension: self.extension,
            dedupe: self.dedupe,
        }
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            alpha: self.alpha,
            ..OverlayStyle::default()
        }
    }

    /// Pulls hand-edited values back into their valid ranges.
    fn sanitized(self) -> Self {
        Self {
            weapon_confidence: self.weapon_confidence.clamp(0.0, 1.0),
            extension: self.extension.max(0),
            alpha: self.alpha.clamp(0.0, 1.0),
            ..self
        }
    }
}
