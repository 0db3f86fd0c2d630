//! Sample-rate conversion for the classifier path.
//!
//! ## Design
//!
//! Speech classifiers are trained on 16 kHz mono. Decoded clips arrive at
//! whatever rate the file was recorded at (commonly 44.1 or 48 kHz).
//! [`RubatoResampler`] bridges that gap with a band-limited sinc resampler,
//! processing the whole clip in fixed-size chunks.
//!
//! When source rate == target rate the mono mixdown is returned as-is and no
//! rubato session is created.
//!
//! The [`Resampler`] trait exists so the classifier detector can be tested
//! with synthetic streams and so hosts can plug in their own converter.

use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use tracing::debug;

use super::{buffer::SampleBuffer, mixdown::mix_to_mono};
use crate::error::{HushtrimError, Result};

/// Input rate required by the speech classifier.
pub const CLASSIFIER_SAMPLE_RATE: u32 = 16_000;

/// Input frames per rubato call.
const CHUNK_SIZE: usize = 1024;

/// Capability: turn a multi-channel buffer into mono at `target_rate`.
pub trait Resampler: Send + Sync {
    /// Mix `buffer` down to mono and convert it to `target_rate`.
    ///
    /// The result holds `ceil(frames * target_rate / source_rate)` samples.
    fn resample_mono(&self, buffer: &SampleBuffer, target_rate: u32) -> Result<Vec<f32>>;
}

/// Anti-aliased sinc resampler backed by `rubato::SincFixedIn`.
#[derive(Debug, Clone)]
pub struct RubatoResampler {
    sinc_len: usize,
    oversampling_factor: usize,
}

impl RubatoResampler {
    pub fn new() -> Self {
        Self {
            sinc_len: 128,
            oversampling_factor: 128,
        }
    }

    fn parameters(&self) -> SincInterpolationParameters {
        SincInterpolationParameters {
            sinc_len: self.sinc_len,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: self.oversampling_factor,
            window: WindowFunction::BlackmanHarris2,
        }
    }
}

impl Default for RubatoResampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Resampler for RubatoResampler {
    fn resample_mono(&self, buffer: &SampleBuffer, target_rate: u32) -> Result<Vec<f32>> {
        if target_rate == 0 {
            return Err(HushtrimError::Resample("target rate must be positive".into()));
        }

        let mono = mix_to_mono(buffer).samples;
        let source_rate = buffer.sample_rate();
        if source_rate == target_rate || mono.is_empty() {
            return Ok(mono);
        }

        let ratio = target_rate as f64 / source_rate as f64;
        let expected = (mono.len() as f64 * ratio).ceil() as usize;

        let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, self.parameters(), CHUNK_SIZE, 1)
            .map_err(|e| HushtrimError::Resample(format!("resampler init: {e}")))?;

        let delay = resampler.output_delay();
        let mut output_buf = vec![vec![0f32; resampler.output_frames_max()]; 1];
        let mut out = Vec::with_capacity(expected + delay);

        debug!(
            source_rate,
            target_rate,
            frames = mono.len(),
            expected,
            delay,
            "resampling clip"
        );

        let mut pos = 0;
        while mono.len() - pos >= CHUNK_SIZE {
            let (_, produced) = resampler
                .process_into_buffer(&[&mono[pos..pos + CHUNK_SIZE]], &mut output_buf, None)
                .map_err(|e| HushtrimError::Resample(e.to_string()))?;
            out.extend_from_slice(&output_buf[0][..produced]);
            pos += CHUNK_SIZE;
        }

        if pos < mono.len() {
            let (_, produced) = resampler
                .process_partial_into_buffer(Some(&[&mono[pos..]][..]), &mut output_buf, None)
                .map_err(|e| HushtrimError::Resample(e.to_string()))?;
            out.extend_from_slice(&output_buf[0][..produced]);
        }

        // Flush the filter tail until the delayed signal is fully out.
        while out.len() < delay + expected {
            let (_, produced) = resampler
                .process_partial_into_buffer(None::<&[&[f32]]>, &mut output_buf, None)
                .map_err(|e| HushtrimError::Resample(e.to_string()))?;
            if produced == 0 {
                break;
            }
            out.extend_from_slice(&output_buf[0][..produced]);
        }

        out.drain(..delay.min(out.len()));
        out.resize(expected, 0.0);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, rate: u32, secs: f32) -> Vec<f32> {
        let n = (rate as f32 * secs) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn passthrough_at_target_rate() {
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        let buf = SampleBuffer::mono(samples.clone(), 16_000).unwrap();
        let out = RubatoResampler::new().resample_mono(&buf, 16_000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn passthrough_still_mixes_down() {
        let buf = SampleBuffer::new(vec![vec![1.0; 4], vec![0.0; 4]], 16_000).unwrap();
        let out = RubatoResampler::new().resample_mono(&buf, 16_000).unwrap();
        assert_eq!(out, vec![0.5; 4]);
    }

    #[test]
    fn downsample_48k_length_matches_duration() {
        let buf = SampleBuffer::mono(tone(440.0, 48_000, 1.0), 48_000).unwrap();
        let out = RubatoResampler::new().resample_mono(&buf, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn odd_rate_rounds_length_up() {
        // 1000 frames at 44.1 kHz → 362.8 → 363 samples at 16 kHz
        let buf = SampleBuffer::mono(vec![0.0; 1000], 44_100).unwrap();
        let out = RubatoResampler::new().resample_mono(&buf, 16_000).unwrap();
        assert_eq!(out.len(), 363);
    }

    #[test]
    fn tone_energy_survives_conversion() {
        let buf = SampleBuffer::mono(tone(440.0, 48_000, 0.5), 48_000).unwrap();
        let out = RubatoResampler::new().resample_mono(&buf, 16_000).unwrap();
        let mid = &out[1000..7000];
        let rms = (mid.iter().map(|s| s * s).sum::<f32>() / mid.len() as f32).sqrt();
        // RMS of a 0.5-amplitude sine ≈ 0.354
        assert!((rms - 0.354).abs() < 0.03, "rms={rms}");
    }

    #[test]
    fn empty_buffer_yields_empty_stream() {
        let buf = SampleBuffer::mono(vec![], 44_100).unwrap();
        let out = RubatoResampler::new().resample_mono(&buf, 16_000).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn zero_target_rate_is_an_error() {
        let buf = SampleBuffer::mono(vec![0.0; 10], 44_100).unwrap();
        assert!(RubatoResampler::new().resample_mono(&buf, 0).is_err());
    }
}
