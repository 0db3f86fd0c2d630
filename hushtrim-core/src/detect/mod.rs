//! Silence detection strategies.
//!
//! Every strategy produces the same [`DetectionResult`], so callers never
//! depend on which one is active. [`SilenceDetector`] is the closed set of
//! strategies, built from a [`DetectionStrategy`] by configuration:
//!
//! | Strategy | Runs on | Uses |
//! |----------|---------|------|
//! | `Energy` | calling thread | windowed RMS vs. dB threshold |
//! | `Background` | Tokio blocking pool | same algorithm as `Energy` |
//! | `Classifier` | calling thread | 16 kHz resample + [`SpeechClassifier`] |

pub mod background;
pub mod classifier;
pub mod energy;
pub mod options;
pub mod region;

#[cfg(feature = "onnx")]
pub mod silero;

#[cfg(feature = "onnx")]
pub use silero::SileroClassifier;

pub use background::BackgroundDetector;
pub use classifier::{
    ClassifierDetector, ClassifierHandle, SegmentationParams, SpeechClassifier, SpeechSegment,
    MIN_SILENCE_SECS,
};
pub use energy::EnergyDetector;
pub use options::{DetectionOptions, ThresholdPreset};
pub use region::{DetectionResult, SilenceRegion, EDGE_EPSILON_SECS};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    audio::SampleBuffer,
    error::{HushtrimError, Result},
};

/// Contract for strategies that run to completion on the calling thread.
pub trait DetectSilence: Send + Sync {
    /// Locate silence in `buffer`.
    ///
    /// # Errors
    /// Configuration errors are reported before any analysis runs.
    fn detect(&self, buffer: &SampleBuffer, options: &DetectionOptions) -> Result<DetectionResult>;
}

/// Which detector a host wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStrategy {
    #[default]
    Energy,
    Background,
    Classifier,
}

impl DetectionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Background => "background",
            Self::Classifier => "classifier",
        }
    }
}

impl std::str::FromStr for DetectionStrategy {
    type Err = HushtrimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "energy" | "rms" => Ok(Self::Energy),
            "background" | "worker" => Ok(Self::Background),
            "classifier" | "vad" => Ok(Self::Classifier),
            other => Err(HushtrimError::InvalidConfig(format!(
                "unknown detection strategy '{other}'"
            ))),
        }
    }
}

/// One of the interchangeable detection strategies.
#[derive(Debug, Clone)]
pub enum SilenceDetector {
    Energy(EnergyDetector),
    Background(BackgroundDetector),
    Classifier(ClassifierDetector),
}

impl SilenceDetector {
    /// Build the detector for `strategy`.
    ///
    /// # Errors
    /// `HushtrimError::MissingClassifier` if `Classifier` is requested without
    /// a classifier.
    pub fn from_strategy(
        strategy: DetectionStrategy,
        classifier: Option<ClassifierHandle>,
    ) -> Result<Self> {
        let detector = match strategy {
            DetectionStrategy::Energy => Self::Energy(EnergyDetector::new()),
            DetectionStrategy::Background => Self::Background(BackgroundDetector::new()),
            DetectionStrategy::Classifier => Self::Classifier(ClassifierDetector::new(
                classifier.ok_or(HushtrimError::MissingClassifier)?,
            )),
        };
        info!(strategy = detector.strategy().as_str(), "silence detector ready");
        Ok(detector)
    }

    pub fn strategy(&self) -> DetectionStrategy {
        match self {
            Self::Energy(_) => DetectionStrategy::Energy,
            Self::Background(_) => DetectionStrategy::Background,
            Self::Classifier(_) => DetectionStrategy::Classifier,
        }
    }

    /// Run the selected strategy over `buffer`.
    pub async fn detect(
        &self,
        buffer: &SampleBuffer,
        options: &DetectionOptions,
    ) -> Result<DetectionResult> {
        match self {
            Self::Energy(d) => d.detect(buffer, options),
            Self::Background(d) => d.detect(buffer, options).await,
            Self::Classifier(d) => d.detect(buffer, options),
        }
    }
}
