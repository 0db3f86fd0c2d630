//! Energy-detector knobs and the named threshold presets.

use serde::{Deserialize, Serialize};

use crate::error::{HushtrimError, Result};

/// Default RMS threshold (dBFS).
pub const DEFAULT_THRESHOLD_DB: f64 = -40.0;
/// Default minimum reportable silence (ms).
pub const DEFAULT_MIN_DURATION_MS: f64 = 300.0;
/// Default analysis window (ms).
pub const DEFAULT_WINDOW_SIZE_MS: f64 = 50.0;

/// Named thresholds offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdPreset {
    /// -50 dB: only very faint audio counts as silence.
    Quiet,
    /// -40 dB: suits most speech recordings.
    #[default]
    Default,
    /// -30 dB: low-level room noise also counts as silence.
    Moderate,
}

impl ThresholdPreset {
    pub const ALL: [ThresholdPreset; 3] = [Self::Quiet, Self::Default, Self::Moderate];

    pub fn threshold_db(self) -> f64 {
        match self {
            Self::Quiet => -50.0,
            Self::Default => -40.0,
            Self::Moderate => -30.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Default => "default",
            Self::Moderate => "moderate",
        }
    }
}

impl std::str::FromStr for ThresholdPreset {
    type Err = HushtrimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "default" => Ok(Self::Default),
            "moderate" => Ok(Self::Moderate),
            other => Err(HushtrimError::InvalidConfig(format!(
                "unknown threshold preset '{other}'"
            ))),
        }
    }
}

/// Options for the energy-threshold detector.
///
/// The classifier strategy accepts the same struct for interface parity but
/// ignores every field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct DetectionOptions {
    /// Windows with RMS strictly below `10^(threshold_db / 20)` are silent.
    pub threshold_db: f64,
    /// Merged silent runs shorter than this are dropped.
    pub min_duration_ms: f64,
    /// Analysis window length.
    pub window_size_ms: f64,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            min_duration_ms: DEFAULT_MIN_DURATION_MS,
            window_size_ms: DEFAULT_WINDOW_SIZE_MS,
        }
    }
}

impl DetectionOptions {
    /// Defaults with the preset's threshold.
    pub fn from_preset(preset: ThresholdPreset) -> Self {
        Self {
            threshold_db: preset.threshold_db(),
            ..Self::default()
        }
    }

    pub fn with_threshold_db(mut self, threshold_db: f64) -> Self {
        self.threshold_db = threshold_db;
        self
    }

    pub fn with_min_duration_ms(mut self, min_duration_ms: f64) -> Self {
        self.min_duration_ms = min_duration_ms;
        self
    }

    pub fn with_window_size_ms(mut self, window_size_ms: f64) -> Self {
        self.window_size_ms = window_size_ms;
        self
    }

    /// Linear amplitude corresponding to `threshold_db`.
    pub fn amplitude_threshold(&self) -> f64 {
        10f64.powf(self.threshold_db / 20.0)
    }

    /// Window length in samples at `sample_rate`: `floor(ms / 1000 * rate)`.
    ///
    /// # Errors
    /// `HushtrimError::InvalidConfig` if the window resolves to zero samples.
    pub fn window_size_samples(&self, sample_rate: u32) -> Result<usize> {
        let samples = (self.window_size_ms / 1000.0 * sample_rate as f64).floor();
        if !samples.is_finite() || samples < 1.0 {
            return Err(HushtrimError::InvalidConfig(format!(
                "window of {} ms at {} Hz is shorter than one sample",
                self.window_size_ms, sample_rate
            )));
        }
        Ok(samples as usize)
    }

    /// Reject values that cannot drive an analysis.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_db.is_finite() {
            return Err(HushtrimError::InvalidConfig(
                "threshold_db must be finite".into(),
            ));
        }
        if !self.min_duration_ms.is_finite() || self.min_duration_ms < 0.0 {
            return Err(HushtrimError::InvalidConfig(
                "min_duration_ms must be a non-negative number".into(),
            ));
        }
        if !self.window_size_ms.is_finite() || self.window_size_ms <= 0.0 {
            return Err(HushtrimError::InvalidConfig(
                "window_size_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
