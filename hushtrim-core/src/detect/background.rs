//! Energy detection offloaded to Tokio's blocking pool.
//!
//! The caller's task mixes down and validates options, then moves the
//! [`MonoSignal`] into a `spawn_blocking` closure. The worker owns the samples
//! from that point on. One request yields exactly one response: no partial
//! results, no retry. Dropping the returned future does not stop the worker;
//! the computation finishes and its result is discarded.

use tracing::error;

use super::{energy::analyse, options::DetectionOptions, region::DetectionResult};
use crate::{
    audio::{mix_to_mono, MonoSignal, SampleBuffer},
    error::{HushtrimError, Result},
};

/// Runs the energy algorithm off the calling task.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundDetector;

impl BackgroundDetector {
    pub fn new() -> Self {
        Self
    }

    /// Mix `buffer` down on the caller, then analyse it on a worker thread.
    ///
    /// # Errors
    /// - `HushtrimError::InvalidConfig` before dispatch if `options` are unusable.
    /// - `HushtrimError::Worker` if no Tokio runtime is available or the worker panicked.
    pub async fn detect(
        &self,
        buffer: &SampleBuffer,
        options: &DetectionOptions,
    ) -> Result<DetectionResult> {
        self.detect_signal(mix_to_mono(buffer), *options).await
    }

    /// Analyse an already mixed-down signal on a worker thread, taking ownership of it.
    pub async fn detect_signal(
        &self,
        signal: MonoSignal,
        options: DetectionOptions,
    ) -> Result<DetectionResult> {
        options.validate()?;
        let window = options.window_size_samples(signal.sample_rate)?;
        run_on_worker(move || analyse(&signal, window, &options)).await
    }
}

/// Execute `job` on the blocking pool and await its single result.
pub(crate) async fn run_on_worker<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current().map_err(|e| {
        error!("background detection unavailable: {e}");
        HushtrimError::Worker(format!("no async runtime: {e}"))
    })?;

    handle.spawn_blocking(job).await.map_err(|e| {
        error!("background detection worker failed: {e}");
        HushtrimError::Worker(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{energy::EnergyDetector, DetectSilence};

    fn speech_and_pauses() -> SampleBuffer {
        let mut samples = vec![0.0f32; 8_000];
        samples.extend(vec![0.3; 16_000]);
        samples.extend(vec![0.0; 4_000]);
        samples.extend(vec![0.3; 8_000]);
        samples.extend(vec![0.0; 8_000]);
        SampleBuffer::mono(samples, 8_000).unwrap()
    }

    #[tokio::test]
    async fn matches_inline_detection() {
        let buf = speech_and_pauses();
        let opts = DetectionOptions::default();
        let inline = EnergyDetector::new().detect(&buf, &opts).unwrap();
        let offloaded = BackgroundDetector::new().detect(&buf, &opts).await.unwrap();
        assert_eq!(inline, offloaded);
        assert_eq!(offloaded.silences.len(), 3);
    }

    #[tokio::test]
    async fn config_error_reported_before_dispatch() {
        let buf = speech_and_pauses();
        let opts = DetectionOptions::default().with_window_size_ms(0.01);
        let err = BackgroundDetector::new().detect(&buf, &opts).await.unwrap_err();
        assert!(matches!(err, HushtrimError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn owned_signal_with_bad_options_never_reaches_worker() {
        let signal = mix_to_mono(&speech_and_pauses());
        let opts = DetectionOptions::default().with_threshold_db(f64::INFINITY);
        let err = BackgroundDetector::new()
            .detect_signal(signal, opts)
            .await
            .unwrap_err();
        assert!(matches!(err, HushtrimError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn worker_panic_is_wrapped() {
        let err = run_on_worker(|| -> usize { panic!("boom") }).await.unwrap_err();
        assert!(matches!(err, HushtrimError::Worker(_)));
    }

    #[tokio::test]
    async fn concurrent_calls_are_independent() {
        let buf = speech_and_pauses();
        let detector = BackgroundDetector::new();
        let quiet = DetectionOptions::default().with_min_duration_ms(600.0);
        let defaults = DetectionOptions::default();
        let (a, b) = tokio::join!(
            detector.detect(&buf, &defaults),
            detector.detect(&buf, &quiet),
        );
        assert_eq!(a.unwrap().silences.len(), 3);
        assert_eq!(b.unwrap().silences.len(), 2);
    }
}
