//! Persistent CLI settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use hushtrim_core::{DetectionOptions, DetectionStrategy, ThresholdPreset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct CliSettings {
    pub strategy: DetectionStrategy,
    pub preset: ThresholdPreset,
    /// Overrides the preset's threshold when set.
    pub threshold_db: Option<f64>,
    pub min_duration_ms: f64,
    pub window_size_ms: f64,
    pub silero_model_path: Option<PathBuf>,
    pub silero_threshold: f32,
}

impl Default for CliSettings {
    fn default() -> Self {
        let defaults = DetectionOptions::default();
        Self {
            strategy: DetectionStrategy::Energy,
            preset: ThresholdPreset::Default,
            threshold_db: None,
            min_duration_ms: defaults.min_duration_ms,
            window_size_ms: defaults.window_size_ms,
            silero_model_path: None,
            silero_threshold: 0.5,
        }
    }
}

impl CliSettings {
    /// Repair values read from disk so a stale or hand-edited file never
    /// blocks a run. Command-line overrides bypass this.
    pub fn normalize(&mut self) {
        let defaults = DetectionOptions::default();
        self.threshold_db = self
            .threshold_db
            .filter(|db| db.is_finite())
            .map(|db| db.clamp(-120.0, 0.0));
        self.min_duration_ms = if self.min_duration_ms.is_finite() {
            self.min_duration_ms.clamp(0.0, 60_000.0)
        } else {
            defaults.min_duration_ms
        };
        self.window_size_ms = if self.window_size_ms.is_finite() && self.window_size_ms > 0.0 {
            self.window_size_ms.clamp(1.0, 1_000.0)
        } else {
            defaults.window_size_ms
        };
        self.silero_threshold = if self.silero_threshold.is_finite() {
            self.silero_threshold.clamp(0.05, 0.95)
        } else {
            0.5
        };
        self.silero_model_path = self
            .silero_model_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }

    /// Energy-detector options: preset threshold unless overridden.
    pub fn detection_options(&self) -> DetectionOptions {
        DetectionOptions::from_preset(self.preset)
            .with_threshold_db(self.threshold_db.unwrap_or_else(|| self.preset.threshold_db()))
            .with_min_duration_ms(self.min_duration_ms)
            .with_window_size_ms(self.window_size_ms)
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hushtrim")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("hushtrim")
            .join("settings.json")
    }
}

/// Read settings, falling back to defaults if the file is missing or unreadable.
pub fn load_settings(path: &Path) -> CliSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<CliSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &CliSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
