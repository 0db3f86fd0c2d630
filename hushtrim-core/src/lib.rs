//! # hushtrim-core
//!
//! Silence-detection engine for an audio trimmer.
//!
//! ## Architecture
//!
//! ```text
//! SampleBuffer ─┬─► mix_to_mono ─► RMS windows ─► merge + min-duration ─┐
//!               │                  (inline or spawn_blocking)          │
//!               └─► Resampler(16 kHz) ─► SpeechClassifier ─► invert ────┤
//!                                                                      ▼
//!                                  DetectionResult ─► optimal_trim_points
//! ```
//!
//! The decoder, waveform view and region editor live outside this crate.
//! They hand in a [`SampleBuffer`] and consume [`DetectionResult`] /
//! [`TrimPoints`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod detect;
pub mod error;
pub mod trim;

// Convenience re-exports for downstream crates
pub use audio::{mix_to_mono, MonoSignal, Resampler, RubatoResampler, SampleBuffer};
pub use detect::{
    BackgroundDetector, ClassifierDetector, ClassifierHandle, DetectSilence, DetectionOptions,
    DetectionResult, DetectionStrategy, EnergyDetector, SilenceDetector, SilenceRegion,
    SpeechClassifier, SpeechSegment, ThresholdPreset,
};
pub use error::HushtrimError;
pub use trim::{optimal_trim_points, TrimPoints};

#[cfg(feature = "onnx")]
pub use detect::SileroClassifier;
