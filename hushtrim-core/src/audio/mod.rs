//! Decoded audio as the detector sees it.
//!
//! The engine never decodes compressed formats. An external decoder hands
//! over a [`SampleBuffer`]; everything downstream works on the derived
//! [`MonoSignal`] (energy path) or a 16 kHz resampled stream (classifier path).

pub mod buffer;
pub mod mixdown;
pub mod resample;

pub use buffer::SampleBuffer;
pub use mixdown::{mix_to_mono, MonoSignal};
pub use resample::{Resampler, RubatoResampler, CLASSIFIER_SAMPLE_RATE};
