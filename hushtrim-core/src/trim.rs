//! Trim points that cut leading and trailing dead air.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::detect::DetectionResult;

/// Suggested selection `[start, end]` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimPoints {
    pub start: f64,
    pub end: f64,
}

impl TrimPoints {
    pub fn duration_secs(&self) -> f64 {
        self.end - self.start
    }
}

/// Derive trim points from a detection result.
///
/// Starts after the leading silence and ends before the trailing silence.
/// When that leaves nothing (`start >= end`, e.g. an all-silent clip) a short
/// window around the middle is returned instead: `min(0.5, duration * 0.1)`
/// seconds long, clamped to `[0, duration]`.
pub fn optimal_trim_points(result: &DetectionResult, duration: f64) -> TrimPoints {
    let start = result.leading_silence.as_ref().map_or(0.0, |r| r.end);
    let end = result
        .trailing_silence
        .as_ref()
        .map_or(duration, |r| r.start);

    if start < end {
        return TrimPoints { start, end };
    }

    let middle = duration / 2.0;
    let min_length = (duration * 0.1).min(0.5);
    let fallback = TrimPoints {
        start: (middle - min_length / 2.0).max(0.0),
        end: (middle + min_length / 2.0).min(duration),
    };
    warn!(
        duration,
        start = fallback.start,
        end = fallback.end,
        "no audible range between edge silences, using centred selection"
    );
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::SilenceRegion;
    use approx::assert_relative_eq;

    fn result(regions: Vec<SilenceRegion>, duration: f64) -> DetectionResult {
        DetectionResult::from_regions(regions, duration)
    }

    #[test]
    fn no_silence_keeps_whole_clip() {
        let trim = optimal_trim_points(&DetectionResult::default(), 7.5);
        assert_eq!(trim, TrimPoints { start: 0.0, end: 7.5 });
    }

    #[test]
    fn excludes_edge_silence() {
        let r = result(
            vec![
                SilenceRegion::new(0, 0.0, 1.2),
                SilenceRegion::new(1, 4.0, 4.5),
                SilenceRegion::new(2, 8.7, 10.0),
            ],
            10.0,
        );
        let trim = optimal_trim_points(&r, 10.0);
        assert_relative_eq!(trim.start, 1.2);
        assert_relative_eq!(trim.end, 8.7);
    }

    #[test]
    fn interior_silence_does_not_move_trim() {
        let r = result(vec![SilenceRegion::new(0, 3.0, 4.0)], 10.0);
        assert_eq!(optimal_trim_points(&r, 10.0), TrimPoints { start: 0.0, end: 10.0 });
    }

    #[test]
    fn all_silent_clip_uses_centred_half_second() {
        let r = result(vec![SilenceRegion::new(0, 0.0, 10.0)], 10.0);
        let trim = optimal_trim_points(&r, 10.0);
        assert_relative_eq!(trim.start, 4.75);
        assert_relative_eq!(trim.end, 5.25);
    }

    #[test]
    fn short_clip_fallback_scales_with_duration() {
        let r = result(vec![SilenceRegion::new(0, 0.0, 1.0)], 1.0);
        let trim = optimal_trim_points(&r, 1.0);
        assert_relative_eq!(trim.start, 0.45, epsilon = 1e-12);
        assert_relative_eq!(trim.end, 0.55, epsilon = 1e-12);
    }

    #[test]
    fn touching_edges_trigger_fallback() {
        let r = result(
            vec![SilenceRegion::new(0, 0.0, 2.0), SilenceRegion::new(1, 2.0, 4.0)],
            4.0,
        );
        let trim = optimal_trim_points(&r, 4.0);
        assert!(trim.start < trim.end);
        assert_relative_eq!(trim.start + trim.end, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn always_valid_for_positive_durations() {
        for &duration in &[0.001, 0.05, 0.3, 1.0, 2.5, 60.0, 3_600.0] {
            let r = result(vec![SilenceRegion::new(0, 0.0, duration)], duration);
            let trim = optimal_trim_points(&r, duration);
            assert!(trim.start >= 0.0, "start < 0 for {duration}");
            assert!(trim.start < trim.end, "empty range for {duration}");
            assert!(trim.end <= duration, "end past clip for {duration}");
        }
    }
}
