//! Silence regions and the leading/trailing classification shared by every
//! strategy.

use serde::{Deserialize, Serialize};

/// Tolerance for "touches the clip boundary", absorbing window rounding.
pub const EDGE_EPSILON_SECS: f64 = 0.01;

/// A reportable stretch of silence, `[start, end)` in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilenceRegion {
    /// `silence-<n>`, unique and ordinal within one result.
    pub id: String,
    pub start: f64,
    pub end: f64,
}

impl SilenceRegion {
    pub fn new(ordinal: usize, start: f64, end: f64) -> Self {
        Self {
            id: format!("silence-{ordinal}"),
            start,
            end,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end - self.start
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_secs() * 1000.0
    }
}

/// Output of a detection call.
///
/// `leading_silence` / `trailing_silence` are value-equal copies of the first
/// and last entries of `silences` (or `None`); they never hold a region that
/// is absent from `silences`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub silences: Vec<SilenceRegion>,
    pub leading_silence: Option<SilenceRegion>,
    pub trailing_silence: Option<SilenceRegion>,
}

impl DetectionResult {
    /// Wrap an ordered region list and classify its edges against `duration`.
    pub fn from_regions(silences: Vec<SilenceRegion>, duration: f64) -> Self {
        let (leading_silence, trailing_silence) = classify_edges(&silences, duration);
        Self {
            silences,
            leading_silence,
            trailing_silence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.silences.is_empty()
    }

    /// Sum of all region lengths in seconds.
    pub fn total_silence_duration(&self) -> f64 {
        self.silences.iter().map(SilenceRegion::duration_secs).sum()
    }
}

/// Pick out the regions touching the clip start and end.
///
/// The two checks are independent: a single region spanning the whole clip
/// is both leading and trailing.
pub fn classify_edges(
    silences: &[SilenceRegion],
    duration: f64,
) -> (Option<SilenceRegion>, Option<SilenceRegion>) {
    let leading = silences
        .first()
        .filter(|r| r.start < EDGE_EPSILON_SECS)
        .cloned();
    let trailing = silences
        .last()
        .filter(|r| (r.end - duration).abs() < EDGE_EPSILON_SECS)
        .cloned();
    (leading, trailing)
}

/// Hands out sequential ids to the candidates that survive filtering.
#[derive(Debug, Default)]
pub(crate) struct RegionCollector {
    regions: Vec<SilenceRegion>,
}

impl RegionCollector {
    pub(crate) fn push(&mut self, start: f64, end: f64) {
        let ordinal = self.regions.len();
        self.regions.push(SilenceRegion::new(ordinal, start, end));
    }

    pub(crate) fn finish(self, duration: f64) -> DetectionResult {
        DetectionResult::from_regions(self.regions, duration)
    }
}
