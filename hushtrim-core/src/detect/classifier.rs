//! Silence as the complement of classifier-detected speech.
//!
//! ## Pipeline
//!
//! ```text
//! SampleBuffer ─► Resampler (16 kHz mono) ─► SpeechClassifier ─► speech segments
//!                                                                     │
//!                                              invert over [0, duration] + 0.3 s filter
//!                                                                     │
//!                                                              DetectionResult
//! ```
//!
//! Classifier or resampler failures abort the call. There is no fallback to
//! the energy strategy.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{
    options::DetectionOptions,
    region::{DetectionResult, RegionCollector},
    DetectSilence,
};
use crate::{
    audio::{Resampler, RubatoResampler, SampleBuffer, CLASSIFIER_SAMPLE_RATE},
    error::Result,
};

/// Gaps shorter than this are not reported as silence.
pub const MIN_SILENCE_SECS: f64 = 0.3;

/// A run of speech in sample indices at [`CLASSIFIER_SAMPLE_RATE`], `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechSegment {
    pub start: usize,
    pub end: usize,
}

impl SpeechSegment {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability: label a 16 kHz mono stream as speech / non-speech.
///
/// Implementors may be stateful (recurrent hidden state etc.); `reset` is
/// called before every detection so results depend only on the input.
pub trait SpeechClassifier: Send + 'static {
    /// Ordered, non-overlapping speech segments of `samples`.
    fn segments(&mut self, samples: &[f32]) -> Result<Vec<SpeechSegment>>;

    /// Clear any internal state.
    fn reset(&mut self);
}

/// Thread-safe reference-counted handle to any `SpeechClassifier` implementor.
#[derive(Clone)]
pub struct ClassifierHandle(pub Arc<Mutex<dyn SpeechClassifier>>);

impl ClassifierHandle {
    pub fn new<C: SpeechClassifier>(classifier: C) -> Self {
        Self(Arc::new(Mutex::new(classifier)))
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle").finish_non_exhaustive()
    }
}

/// Detector that delegates segmentation to a [`SpeechClassifier`].
#[derive(Clone)]
pub struct ClassifierDetector {
    classifier: ClassifierHandle,
    resampler: Arc<dyn Resampler>,
}

impl ClassifierDetector {
    /// Use the default sinc resampler in front of `classifier`.
    pub fn new(classifier: ClassifierHandle) -> Self {
        Self::with_resampler(classifier, Arc::new(RubatoResampler::new()))
    }

    pub fn with_resampler(classifier: ClassifierHandle, resampler: Arc<dyn Resampler>) -> Self {
        Self {
            classifier,
            resampler,
        }
    }
}

impl std::fmt::Debug for ClassifierDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierDetector")
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl DetectSilence for ClassifierDetector {
    /// `options` are accepted for parity with the energy detector and ignored.
    fn detect(&self, buffer: &SampleBuffer, _options: &DetectionOptions) -> Result<DetectionResult> {
        let duration = buffer.duration_secs();
        let stream = self
            .resampler
            .resample_mono(buffer, CLASSIFIER_SAMPLE_RATE)?;

        let speech = {
            let mut classifier = self.classifier.0.lock();
            classifier.reset();
            classifier.segments(&stream)?
        };

        let result = invert_speech(&speech, duration);
        debug!(
            speech_segments = speech.len(),
            regions = result.silences.len(),
            leading = result.leading_silence.is_some(),
            trailing = result.trailing_silence.is_some(),
            "classifier detection complete"
        );
        Ok(result)
    }
}

/// Complement of `speech` over `[0, duration]`, keeping gaps of at least
/// [`MIN_SILENCE_SECS`].
pub fn invert_speech(speech: &[SpeechSegment], duration: f64) -> DetectionResult {
    let to_secs = |idx: usize| (idx as f64 / CLASSIFIER_SAMPLE_RATE as f64).min(duration);
    let mut collector = RegionCollector::default();

    // With no speech at all this reduces to a single [0, duration) candidate.
    let mut cursor = 0.0;
    for seg in speech {
        let start = to_secs(seg.start);
        if start - cursor >= MIN_SILENCE_SECS {
            collector.push(cursor, start);
        }
        cursor = cursor.max(to_secs(seg.end));
    }
    if duration - cursor >= MIN_SILENCE_SECS {
        collector.push(cursor, duration);
    }

    collector.finish(duration)
}

/// Knobs for turning per-window speech probabilities into segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationParams {
    /// Probability at or above which a window starts speech.
    pub threshold: f32,
    /// Speech ends once probability drops below this.
    pub neg_threshold: f32,
    /// Speech runs shorter than this (samples) are discarded.
    pub min_speech_samples: usize,
    /// Pauses shorter than this (samples) do not end a speech run.
    pub min_pause_samples: usize,
    /// Padding added on both sides of each run (samples).
    pub pad_samples: usize,
}

impl SegmentationParams {
    /// Silero-style defaults at 16 kHz: 250 ms min speech, 100 ms min pause, 30 ms pad.
    pub fn with_threshold(threshold: f32) -> Self {
        let ms = |v: usize| v * CLASSIFIER_SAMPLE_RATE as usize / 1000;
        Self {
            threshold,
            neg_threshold: (threshold - 0.15).max(0.01),
            min_speech_samples: ms(250),
            min_pause_samples: ms(100),
            pad_samples: ms(30),
        }
    }
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self::with_threshold(0.5)
    }
}

/// Hysteresis segmentation of per-window speech probabilities.
///
/// `probs[i]` describes samples `[i * window, (i + 1) * window)` of a stream of
/// `total_samples` samples.
pub fn segments_from_probabilities(
    probs: &[f32],
    window: usize,
    total_samples: usize,
    params: &SegmentationParams,
) -> Vec<SpeechSegment> {
    let mut raw = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut pause_start: Option<usize> = None;

    for (i, &p) in probs.iter().enumerate() {
        let pos = (i * window).min(total_samples);
        if p >= params.threshold {
            pause_start = None;
            if current_start.is_none() {
                current_start = Some(pos);
            }
            continue;
        }
        let Some(start) = current_start else {
            continue;
        };
        if p < params.neg_threshold {
            let pause = *pause_start.get_or_insert(pos);
            if pos - pause >= params.min_pause_samples {
                if pause - start >= params.min_speech_samples {
                    raw.push(SpeechSegment::new(start, pause));
                }
                current_start = None;
                pause_start = None;
            }
        }
    }

    if let Some(start) = current_start {
        if total_samples - start >= params.min_speech_samples {
            raw.push(SpeechSegment::new(start, total_samples));
        }
    }

    // Pad, then fuse runs whose padding now overlaps.
    let mut out: Vec<SpeechSegment> = Vec::with_capacity(raw.len());
    for seg in raw {
        let padded = SpeechSegment::new(
            seg.start.saturating_sub(params.pad_samples),
            (seg.end + params.pad_samples).min(total_samples),
        );
        match out.last_mut() {
            Some(prev) if padded.start <= prev.end => prev.end = prev.end.max(padded.end),
            _ => out.push(padded),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HushtrimError;
    use approx::assert_relative_eq;

    const SR: usize = CLASSIFIER_SAMPLE_RATE as usize;

    struct FixedClassifier {
        segments: Vec<SpeechSegment>,
        resets: Arc<Mutex<usize>>,
    }

    impl SpeechClassifier for FixedClassifier {
        fn segments(&mut self, _samples: &[f32]) -> Result<Vec<SpeechSegment>> {
            Ok(self.segments.clone())
        }

        fn reset(&mut self) {
            *self.resets.lock() += 1;
        }
    }

    struct BrokenClassifier;

    impl SpeechClassifier for BrokenClassifier {
        fn segments(&mut self, _samples: &[f32]) -> Result<Vec<SpeechSegment>> {
            Err(HushtrimError::Classifier("model failed to load".into()))
        }

        fn reset(&mut self) {}
    }

    fn secs(s: f64) -> usize {
        (s * SR as f64) as usize
    }

    fn ten_seconds() -> SampleBuffer {
        SampleBuffer::mono(vec![0.0; 10 * SR], CLASSIFIER_SAMPLE_RATE).unwrap()
    }

    #[test]
    fn no_speech_is_one_region() {
        let result = invert_speech(&[], 10.0);
        assert_eq!(result.silences.len(), 1);
        assert_relative_eq!(result.silences[0].start, 0.0);
        assert_relative_eq!(result.silences[0].end, 10.0);
        assert!(result.leading_silence.is_some());
        assert!(result.trailing_silence.is_some());
    }

    #[test]
    fn no_speech_in_tiny_clip_is_empty() {
        assert!(invert_speech(&[], 0.2).is_empty());
    }

    #[test]
    fn complements_speech_with_min_gap() {
        let speech = [
            SpeechSegment::new(secs(1.0), secs(3.0)),
            SpeechSegment::new(secs(3.2), secs(5.0)), // 200 ms gap dropped
            SpeechSegment::new(secs(6.0), secs(9.8)), // 200 ms tail dropped
        ];
        let result = invert_speech(&speech, 10.0);
        let spans: Vec<(f64, f64)> = result.silences.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(spans.len(), 2);
        assert_relative_eq!(spans[0].0, 0.0);
        assert_relative_eq!(spans[0].1, 1.0);
        assert_relative_eq!(spans[1].0, 5.0);
        assert_relative_eq!(spans[1].1, 6.0);
        assert!(result.leading_silence.is_some());
        assert!(result.trailing_silence.is_none());
        assert_eq!(result.silences[1].id, "silence-1");
    }

    #[test]
    fn short_leading_gap_dropped() {
        let speech = [SpeechSegment::new(secs(0.25), secs(9.0))];
        let result = invert_speech(&speech, 10.0);
        assert_eq!(result.silences.len(), 1);
        assert!(result.leading_silence.is_none());
        assert_relative_eq!(result.silences[0].start, 9.0);
        assert!(result.trailing_silence.is_some());
    }

    #[test]
    fn speech_past_duration_is_clamped() {
        let speech = [SpeechSegment::new(secs(2.0), secs(12.0))];
        let result = invert_speech(&speech, 10.0);
        assert_eq!(result.silences.len(), 1);
        assert_relative_eq!(result.silences[0].end, 2.0);
    }

    #[test]
    fn detector_resets_classifier_each_call() {
        let resets = Arc::new(Mutex::new(0));
        let handle = ClassifierHandle::new(FixedClassifier {
            segments: vec![SpeechSegment::new(secs(2.0), secs(8.0))],
            resets: Arc::clone(&resets),
        });
        let detector = ClassifierDetector::new(handle);
        let buf = ten_seconds();

        let first = detector.detect(&buf, &DetectionOptions::default()).unwrap();
        let second = detector.detect(&buf, &DetectionOptions::default()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.silences.len(), 2);
        assert_eq!(*resets.lock(), 2);
    }

    #[test]
    fn threshold_options_are_ignored() {
        let handle = ClassifierHandle::new(FixedClassifier {
            segments: vec![SpeechSegment::new(secs(1.0), secs(9.0))],
            resets: Arc::new(Mutex::new(0)),
        });
        let detector = ClassifierDetector::new(handle);
        let buf = ten_seconds();
        let a = detector.detect(&buf, &DetectionOptions::default()).unwrap();
        let b = detector
            .detect(&buf, &DetectionOptions::default().with_threshold_db(-10.0).with_min_duration_ms(5_000.0))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn classifier_failure_is_fatal() {
        let detector = ClassifierDetector::new(ClassifierHandle::new(BrokenClassifier));
        let err = detector
            .detect(&ten_seconds(), &DetectionOptions::default())
            .unwrap_err();
        assert!(matches!(err, HushtrimError::Classifier(_)));
    }

    #[test]
    fn probabilities_segment_with_hysteresis() {
        let params = SegmentationParams {
            threshold: 0.5,
            neg_threshold: 0.35,
            min_speech_samples: 4,
            min_pause_samples: 2,
            pad_samples: 0,
        };
        // window = 1 sample for readability
        let probs = [0.1, 0.6, 0.4, 0.6, 0.6, 0.1, 0.1, 0.1, 0.9, 0.1];
        let segs = segments_from_probabilities(&probs, 1, probs.len(), &params);
        // 0.4 sits between thresholds and keeps speech alive; the run [1, 5) ends
        // once the pause reaches 2 samples. [8, 9) is too short.
        assert_eq!(segs, vec![SpeechSegment::new(1, 5)]);
    }

    #[test]
    fn brief_pause_does_not_split_speech() {
        let params = SegmentationParams {
            threshold: 0.5,
            neg_threshold: 0.35,
            min_speech_samples: 2,
            min_pause_samples: 3,
            pad_samples: 0,
        };
        let probs = [0.9, 0.9, 0.0, 0.0, 0.9, 0.9, 0.0, 0.0, 0.0, 0.0];
        let segs = segments_from_probabilities(&probs, 1, probs.len(), &params);
        assert_eq!(segs, vec![SpeechSegment::new(0, 6)]);
    }

    #[test]
    fn open_speech_runs_to_end_and_padding_merges() {
        let params = SegmentationParams {
            threshold: 0.5,
            neg_threshold: 0.35,
            min_speech_samples: 2,
            min_pause_samples: 2,
            pad_samples: 2,
        };
        let probs = [0.9, 0.9, 0.0, 0.0, 0.0, 0.9, 0.9, 0.9];
        let segs = segments_from_probabilities(&probs, 10, 75, &params);
        // [0, 20) and [50, 75) padded to [0, 22) and [48, 75)
        assert_eq!(
            segs,
            vec![SpeechSegment::new(0, 22), SpeechSegment::new(48, 75)]
        );
    }

    #[test]
    fn default_params_at_16k() {
        let p = SegmentationParams::default();
        assert_eq!(p.min_speech_samples, 4_000);
        assert_eq!(p.min_pause_samples, 1_600);
        assert_eq!(p.pad_samples, 480);
        assert!((p.neg_threshold - 0.35).abs() < 1e-6);
    }
}
