//! Immutable multi-channel sample buffer.

use crate::error::{HushtrimError, Result};

/// Decoded PCM audio: one `f32` vector per channel at a fixed sample rate.
///
/// Construction validates the shape, so every `SampleBuffer` has at least one
/// channel and all channels share the same frame count.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap planar channel data.
    ///
    /// # Errors
    /// `HushtrimError::InvalidBuffer` if there are no channels, the channels
    /// differ in length, or `sample_rate` is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(HushtrimError::InvalidBuffer(
                "buffer must have at least one channel".into(),
            ));
        }
        if sample_rate == 0 {
            return Err(HushtrimError::InvalidBuffer(
                "sample rate must be positive".into(),
            ));
        }
        let frames = channels[0].len();
        if let Some((idx, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != frames)
        {
            return Err(HushtrimError::InvalidBuffer(format!(
                "channel {idx} has {} frames, expected {frames}",
                ch.len()
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Convenience constructor for a single channel.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Split interleaved frames (`L R L R …`) into planar channels.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(HushtrimError::InvalidBuffer(
                "buffer must have at least one channel".into(),
            ));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Total duration in seconds (`frames / sample_rate`).
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}
