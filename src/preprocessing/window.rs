//! Analysis window selection
//!
//! Intros and outros of long tracks are often beatless or harmonically
//! unrepresentative, so both ends are skipped before key analysis and the
//! analyzed span is capped.

use crate::config::AnalysisConfig;
use std::ops::Range;

/// Sample range of a track to analyze
///
/// If the track is longer than `edge_trim_min_duration_secs` (30 s), the first
/// and last `edge_trim_secs` (10 s) are skipped. The span is then capped at
/// `max_analysis_secs` (120 s) from its start.
///
/// # Example
///
/// ```
/// use tonic_dsp::preprocessing::window::analysis_window;
/// use tonic_dsp::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// // 60 s track at 22050 Hz: skip 10 s at each end
/// let range = analysis_window(60 * 22050, 22050, &config);
/// assert_eq!(range, (10 * 22050)..(50 * 22050));
/// ```
pub fn analysis_window(len: usize, sample_rate: u32, config: &AnalysisConfig) -> Range<usize> {
    if sample_rate == 0 {
        return 0..len;
    }

    let sr = sample_rate as f32;
    let duration = len as f32 / sr;

    let (mut start, mut end) = (0, len);
    if duration > config.edge_trim_min_duration_secs {
        let edge = (config.edge_trim_secs * sr) as usize;
        if 2 * edge < len {
            start = edge;
            end = len - edge;
        }
    }

    let max_len = (config.max_analysis_secs * sr) as usize;
    end = end.min(start + max_len);

    log::debug!(
        "Analysis window: {:.2}s..{:.2}s of {:.2}s",
        start as f32 / sr,
        end as f32 / sr,
        duration
    );

    start..end
}

/// Slice of `samples` selected by [`analysis_window`]
pub fn trim_to_window<'a>(
    samples: &'a [f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> &'a [f32] {
    &samples[analysis_window(samples.len(), sample_rate, config)]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 22050;

    #[test]
    fn test_short_track_is_untouched() {
        let config = AnalysisConfig::default();
        let len = 20 * SR as usize;
        assert_eq!(analysis_window(len, SR, &config), 0..len);

        // Exactly 30 s is not "longer than 30 s"
        let len = 30 * SR as usize;
        assert_eq!(analysis_window(len, SR, &config), 0..len);
    }

    #[test]
    fn test_long_track_edges_skipped() {
        let config = AnalysisConfig::default();
        let len = 45 * SR as usize;
        let range = analysis_window(len, SR, &config);
        assert_eq!(range.start, 10 * SR as usize);
        assert_eq!(range.end, 35 * SR as usize);
    }

    #[test]
    fn test_span_capped_at_max() {
        let config = AnalysisConfig::default();
        let len = 300 * SR as usize;
        let range = analysis_window(len, SR, &config);
        assert_eq!(range.start, 10 * SR as usize);
        assert_eq!(range.end - range.start, 120 * SR as usize);
    }

    #[test]
    fn test_trim_to_window_bounds() {
        let config = AnalysisConfig::default();
        let samples = vec![0.0f32; 40 * SR as usize];
        let trimmed = trim_to_window(&samples, SR, &config);
        assert_eq!(trimmed.len(), 20 * SR as usize);
        assert!(trim_to_window(&[], SR, &config).is_empty());
    }
}
