//! WAV decoding into a [`SampleBuffer`].
//!
//! Integer PCM is normalised to `[-1.0, 1.0]` by its bit depth.

use std::path::Path;

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use hushtrim_core::SampleBuffer;
use tracing::debug;

pub fn read_wav(path: &Path) -> Result<SampleBuffer> {
    let reader =
        WavReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        bail!("{} declares zero channels", path.display());
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .context("failed to decode float samples")?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .context("failed to decode integer samples")?
        }
    };

    debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        bits = spec.bits_per_sample,
        samples = interleaved.len(),
        "decoded wav"
    );

    Ok(SampleBuffer::from_interleaved(
        &interleaved,
        channels,
        spec.sample_rate,
    )?)
}
