//! Windowed RMS silence detection.
//!
//! ## Algorithm
//!
//! 1. Convert `threshold_db` to a linear amplitude: `10^(dB / 20)`.
//! 2. Cut the mono signal into `ceil(len / W)` non-overlapping windows of
//!    `W = floor(window_ms / 1000 * rate)` samples (the last may be short).
//! 3. A window is silent iff its RMS is strictly below the amplitude.
//! 4. Sweep left to right with a virtual non-silent window past the end, so
//!    a run still open at end-of-signal is closed.
//! 5. Each run becomes `[start * W / rate, min(end * W / rate, duration))`
//!    and is kept only if it lasts at least `min_duration_ms`.
//!
//! Short runs are discarded individually. They never bridge two neighbouring
//! runs into one region.

use tracing::debug;

use super::{
    options::DetectionOptions,
    region::{DetectionResult, RegionCollector},
    DetectSilence,
};
use crate::{
    audio::{mix_to_mono, MonoSignal, SampleBuffer},
    error::Result,
};

/// Deterministic RMS-threshold detector running on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyDetector;

impl EnergyDetector {
    pub fn new() -> Self {
        Self
    }
}

impl DetectSilence for EnergyDetector {
    fn detect(&self, buffer: &SampleBuffer, options: &DetectionOptions) -> Result<DetectionResult> {
        detect_mono(&mix_to_mono(buffer), options)
    }
}

/// Run the full energy analysis over an already mixed-down signal.
///
/// # Errors
/// `HushtrimError::InvalidConfig` if the options are invalid or the window
/// resolves to zero samples at the signal's rate.
pub fn detect_mono(signal: &MonoSignal, options: &DetectionOptions) -> Result<DetectionResult> {
    options.validate()?;
    let window = options.window_size_samples(signal.sample_rate)?;
    Ok(analyse(signal, window, options))
}

/// Analysis proper. `window` must come from `options.window_size_samples`.
pub(crate) fn analyse(
    signal: &MonoSignal,
    window: usize,
    options: &DetectionOptions,
) -> DetectionResult {
    let amplitude = options.amplitude_threshold();

    let flags = silent_windows(&signal.samples, window, amplitude);
    let result = merge_silent_windows(
        &flags,
        window,
        signal.sample_rate,
        signal.duration_secs(),
        options.min_duration_ms,
    );

    debug!(
        windows = flags.len(),
        silent_windows = flags.iter().filter(|s| **s).count(),
        regions = result.silences.len(),
        leading = result.leading_silence.is_some(),
        trailing = result.trailing_silence.is_some(),
        "energy detection complete"
    );

    result
}

/// Root-mean-square of a sample slice, accumulated in `f64`.
pub fn window_rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// One flag per window: `true` when the window's RMS is below `amplitude`.
pub fn silent_windows(samples: &[f32], window: usize, amplitude: f64) -> Vec<bool> {
    debug_assert!(window > 0);
    samples
        .chunks(window)
        .map(|w| window_rms(w) < amplitude)
        .collect()
}

/// Merge runs of silent windows into regions and apply the duration filter.
pub fn merge_silent_windows(
    flags: &[bool],
    window: usize,
    sample_rate: u32,
    duration: f64,
    min_duration_ms: f64,
) -> DetectionResult {
    let to_secs = |w: usize| (w * window) as f64 / sample_rate as f64;

    let mut collector = RegionCollector::default();
    let mut run_start: Option<usize> = None;
    let mut dropped = 0usize;

    // `flags.len()` acts as the non-silent sentinel.
    for w in 0..=flags.len() {
        let silent = flags.get(w).copied().unwrap_or(false);
        match (silent, run_start) {
            (true, None) => run_start = Some(w),
            (false, Some(start_w)) => {
                let start = to_secs(start_w);
                let end = to_secs(w).min(duration);
                if (end - start) * 1000.0 >= min_duration_ms {
                    collector.push(start, end);
                } else {
                    dropped += 1;
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if dropped > 0 {
        debug!(dropped, "discarded silent runs shorter than {min_duration_ms} ms");
    }

    collector.finish(duration)
}
