//! Unweighted channel average.

use super::buffer::SampleBuffer;

/// Mono view of a [`SampleBuffer`], owned by exactly one detection call.
///
/// Handing a `MonoSignal` to the background worker moves the allocation;
/// nothing is copied.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoSignal {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Average all channels frame by frame.
///
/// Sums accumulate in `f64` before narrowing back to `f32`.
pub fn mix_to_mono(buffer: &SampleBuffer) -> MonoSignal {
    let channels = buffer.channels();
    debug_assert!(!channels.is_empty(), "SampleBuffer guarantees ≥ 1 channel");

    let samples = if channels.len() == 1 {
        channels[0].clone()
    } else {
        let n = channels.len() as f64;
        (0..buffer.frames())
            .map(|i| {
                let sum: f64 = channels.iter().map(|ch| ch[i] as f64).sum();
                (sum / n) as f32
            })
            .collect()
    };

    MonoSignal::new(samples, buffer.sample_rate())
}
