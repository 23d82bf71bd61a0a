//! Autocorrelation-based BPM estimation
//!
//! Finds periodicity in onset signal using FFT-accelerated autocorrelation.
//!
//! # Algorithm
//!
//! 1. Convert onset list to binary beat signal (frame-based)
//! 2. Compute autocorrelation using FFT acceleration: `ACF = IFFT(|FFT(signal)|²)`
//! 3. Smooth the ACF with a `[0.5, 1, 0.5]` kernel so that periods falling
//!    between two frames are not split across neighbouring lags
//! 4. Weight every lag by a log-normal tempo prior centred on 120 BPM
//! 5. Pick peaks inside the BPM range and refine them by parabolic interpolation
//! 6. Convert lag values to BPM: `BPM = (60 * sample_rate) / (lag * hop_size)`
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.
//!
//! # Example
//!
//! ```no_run
//! use tonic_dsp::features::period::autocorrelation::estimate_bpm_from_autocorrelation;
//!
//! let onsets = vec![0, 11025, 22050, 33075]; // 120 BPM at 22.05kHz
//! let candidates = estimate_bpm_from_autocorrelation(&onsets, 22050, 512, 60.0, 180.0)?;
//! # Ok::<(), tonic_dsp::AnalysisError>(())
//! ```

use super::BpmCandidate;
use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const EPSILON: f32 = 1e-10;

/// Centre of the tempo prior in BPM
const PRIOR_CENTER_BPM: f32 = 120.0;

/// Peaks below this fraction of the strongest weighted lag are ignored
const MIN_PEAK_RATIO: f32 = 0.1;

/// Estimate BPM from autocorrelation
///
/// # Arguments
///
/// * `onsets` - Onset times in samples
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size used for onset detection (samples per frame)
/// * `min_bpm` - Minimum BPM to consider (default: 60.0)
/// * `max_bpm` - Maximum BPM to consider (default: 180.0)
///
/// # Returns
///
/// Vector of BPM candidates ranked by confidence (highest first). Confidence is
/// the prior-weighted ACF value relative to the strongest candidate.
///
/// # Errors
///
/// Returns `AnalysisError` if:
/// - Onset list is empty
/// - Invalid parameters (sample_rate=0, hop_size=0, empty BPM range)
pub fn estimate_bpm_from_autocorrelation(
    onsets: &[usize],
    sample_rate: u32,
    hop_size: usize,
    min_bpm: f32,
    max_bpm: f32,
) -> Result<Vec<BpmCandidate>, AnalysisError> {
    log::debug!(
        "Estimating BPM from autocorrelation: {} onsets, {} Hz, hop={}, range=[{:.1}, {:.1}] BPM",
        onsets.len(),
        sample_rate,
        hop_size,
        min_bpm,
        max_bpm
    );

    if onsets.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty onset list".to_string()));
    }

    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid sample rate: 0".to_string(),
        ));
    }

    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput("Invalid hop size: 0".to_string()));
    }

    if min_bpm <= 0.0 || max_bpm <= 0.0 || min_bpm >= max_bpm {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid BPM range: [{:.1}, {:.1}]",
            min_bpm, max_bpm
        )));
    }

    if onsets.len() < 2 {
        log::warn!("Too few onsets for autocorrelation: {}", onsets.len());
        return Ok(vec![]);
    }

    // Step 1: binary beat signal
    let max_frame = onsets.iter().max().copied().unwrap_or(0) / hop_size;
    let mut beat_signal = vec![0.0f32; max_frame + 1];
    for &onset_sample in onsets {
        beat_signal[onset_sample / hop_size] = 1.0;
    }

    // Steps 2-3
    let acf = smooth(&compute_autocorrelation_fft(&beat_signal));

    // lag = (60 * sample_rate) / (BPM * hop_size)
    let frames_per_minute = 60.0 * sample_rate as f32 / hop_size as f32;
    let lag_min = ((frames_per_minute / max_bpm).ceil() as usize).max(1);
    let lag_max = ((frames_per_minute / min_bpm).floor() as usize).min(acf.len().saturating_sub(1));

    if lag_min > lag_max {
        log::debug!(
            "Empty lag range [{}, {}] for ACF length {}",
            lag_min,
            lag_max,
            acf.len()
        );
        return Ok(vec![]);
    }

    // Step 4
    let weighted: Vec<f32> = acf
        .iter()
        .enumerate()
        .map(|(lag, &v)| {
            if lag == 0 {
                0.0
            } else {
                v * tempo_prior(frames_per_minute / lag as f32)
            }
        })
        .collect();

    // Step 5
    let peaks = find_peaks_in_acf(&weighted, lag_min, lag_max);
    let best = peaks.iter().map(|&(_, v)| v).fold(0.0f32, f32::max);

    // Step 6
    let mut candidates: Vec<BpmCandidate> = peaks
        .into_iter()
        .filter_map(|(lag, value)| {
            let refined = lag as f32 + parabolic_offset(&weighted, lag);
            let bpm = frames_per_minute / refined;
            if bpm < min_bpm || bpm > max_bpm {
                return None;
            }
            Some(BpmCandidate {
                bpm,
                confidence: if best > EPSILON { value / best } else { 0.0 },
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    log::debug!("Autocorrelation found {} BPM candidates", candidates.len());

    Ok(candidates)
}

/// Log-normal tempo prior, 1.0 at 120 BPM and e^-0.5 one octave away
fn tempo_prior(bpm: f32) -> f32 {
    let octaves = (bpm / PRIOR_CENTER_BPM).log2();
    (-0.5 * octaves * octaves).exp()
}

/// Compute autocorrelation using FFT acceleration
///
/// Uses the identity: ACF = IFFT(|FFT(signal)|²), zero-padded to avoid
/// circular wrap-around.
///
/// # Returns
///
/// Autocorrelation function (same length as input)
fn compute_autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(fft_size).process(&mut buffer);

    for x in &mut buffer {
        *x = *x * x.conj();
    }

    planner.plan_fft_inverse(fft_size).process(&mut buffer);

    let scale = 1.0 / (fft_size as f32);
    buffer[..n]
        .iter()
        .map(|x| (x.re * scale).max(0.0))
        .collect()
}

/// Three-tap `[0.5, 1, 0.5]` smoothing; out-of-range neighbours count as 0
fn smooth(acf: &[f32]) -> Vec<f32> {
    let n = acf.len();
    (0..n)
        .map(|i| {
            let left = if i > 0 { acf[i - 1] } else { 0.0 };
            let right = if i + 1 < n { acf[i + 1] } else { 0.0 };
            0.5 * left + acf[i] + 0.5 * right
        })
        .collect()
}

/// Find peaks of `values` with lag in `lag_min..=lag_max`
///
/// A peak is not below its left neighbour, strictly above its right
/// neighbour, and at least 10% of the largest value in the range.
///
/// # Returns
///
/// Vector of (lag, value) pairs, highest value first
fn find_peaks_in_acf(values: &[f32], lag_min: usize, lag_max: usize) -> Vec<(usize, f32)> {
    if values.is_empty() || lag_min > lag_max || lag_max >= values.len() {
        return vec![];
    }

    let max_value = values[lag_min..=lag_max]
        .iter()
        .copied()
        .fold(0.0f32, f32::max);
    if max_value < EPSILON {
        return vec![];
    }
    let floor = max_value * MIN_PEAK_RATIO;

    let mut peaks: Vec<(usize, f32)> = (lag_min..=lag_max)
        .filter_map(|lag| {
            let value = values[lag];
            let left = if lag > 0 { values[lag - 1] } else { f32::NEG_INFINITY };
            let right = values.get(lag + 1).copied().unwrap_or(f32::NEG_INFINITY);
            (value >= left && value > right && value >= floor).then_some((lag, value))
        })
        .collect();

    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    peaks
}

/// Sub-lag offset of the vertex of the parabola through `lag - 1`, `lag`, `lag + 1`
///
/// Returns 0.0 at the edges or when the three points are collinear; the
/// offset is clamped to ±0.5.
fn parabolic_offset(values: &[f32], lag: usize) -> f32 {
    if lag == 0 || lag + 1 >= values.len() {
        return 0.0;
    }
    let (l, c, r) = (values[lag - 1], values[lag], values[lag + 1]);
    let denom = l - 2.0 * c + r;
    if denom.abs() < EPSILON {
        return 0.0;
    }
    (0.5 * (l - r) / denom).clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Onset sample positions of `beats` beats at `bpm`
    fn beat_onsets(bpm: f32, sample_rate: u32, beats: usize) -> Vec<usize> {
        let period = 60.0 * sample_rate as f32 / bpm;
        (0..beats).map(|b| (b as f32 * period) as usize).collect()
    }

    #[test]
    fn test_autocorrelation_basic_120bpm() {
        let onsets = beat_onsets(120.0, 22050, 16);
        let candidates = estimate_bpm_from_autocorrelation(&onsets, 22050, 512, 60.0, 180.0).unwrap();

        assert!(!candidates.is_empty(), "Should find at least one candidate");
        let best = &candidates[0];
        assert!(
            (best.bpm - 120.0).abs() < 2.0,
            "Best BPM should be close to 120, got {:.2}",
            best.bpm
        );
        assert!((best.confidence - 1.0).abs() < 1e-6, "Best candidate has confidence 1");
    }

    #[test]
    fn test_autocorrelation_100bpm() {
        // The two-beat period (50 BPM) lies outside the range
        let onsets = beat_onsets(100.0, 22050, 16);
        let candidates = estimate_bpm_from_autocorrelation(&onsets, 22050, 512, 60.0, 180.0).unwrap();
        assert!(
            (candidates[0].bpm - 100.0).abs() < 2.0,
            "Best BPM should be close to 100, got {:.2}",
            candidates[0].bpm
        );
    }

    #[test]
    fn test_autocorrelation_128bpm() {
        let onsets = beat_onsets(128.0, 22050, 16);
        let candidates = estimate_bpm_from_autocorrelation(&onsets, 22050, 512, 60.0, 180.0).unwrap();

        assert!(!candidates.is_empty());
        let best = &candidates[0];
        assert!(
            (best.bpm - 128.0).abs() < 3.0,
            "Best BPM should be close to 128, got {:.2}",
            best.bpm
        );
    }

    #[test]
    fn test_autocorrelation_empty_onsets() {
        let result = estimate_bpm_from_autocorrelation(&[], 22050, 512, 60.0, 180.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_autocorrelation_single_onset() {
        let result = estimate_bpm_from_autocorrelation(&[1000], 22050, 512, 60.0, 180.0);
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty(), "need at least 2 onsets");
    }

    #[test]
    fn test_autocorrelation_short_signal_has_no_candidates() {
        // Two onsets 3 frames apart: the ACF is shorter than the smallest lag
        let result = estimate_bpm_from_autocorrelation(&[0, 1536], 22050, 512, 60.0, 180.0).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_autocorrelation_invalid_params() {
        let onsets = vec![1000, 2000];
        assert!(estimate_bpm_from_autocorrelation(&onsets, 0, 512, 60.0, 180.0).is_err());
        assert!(estimate_bpm_from_autocorrelation(&onsets, 22050, 0, 60.0, 180.0).is_err());
        assert!(estimate_bpm_from_autocorrelation(&onsets, 22050, 512, 180.0, 60.0).is_err());
    }

    #[test]
    fn test_compute_autocorrelation_fft() {
        let signal = vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let acf = compute_autocorrelation_fft(&signal);

        assert_eq!(acf.len(), signal.len());
        assert!((acf[0] - 3.0).abs() < 1e-4, "ACF[0] is the energy, got {}", acf[0]);
        assert!((acf[1]).abs() < 1e-4);
        assert!((acf[2] - 2.0).abs() < 1e-4);
        assert!((acf[4] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_smooth_kernel() {
        assert_eq!(smooth(&[0.0, 2.0, 0.0]), vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_tempo_prior_shape() {
        assert!((tempo_prior(120.0) - 1.0).abs() < 1e-6);
        assert!((tempo_prior(60.0) - (-0.5f32).exp()).abs() < 1e-5);
        assert!((tempo_prior(240.0) - tempo_prior(60.0)).abs() < 1e-5);
    }

    #[test]
    fn test_find_peaks_in_acf() {
        let acf = vec![0.1, 0.2, 0.5, 0.3, 0.4, 0.6, 0.2, 0.1];
        let peaks = find_peaks_in_acf(&acf, 1, 6);
        assert_eq!(peaks, vec![(5, 0.6), (2, 0.5)]);

        // Plateau reports its last index only
        let plateau = vec![0.0, 1.0, 1.0, 0.0];
        assert_eq!(find_peaks_in_acf(&plateau, 1, 2), vec![(2, 1.0)]);
    }

    #[test]
    fn test_parabolic_offset() {
        assert_eq!(parabolic_offset(&[0.0, 1.0, 0.0], 1), 0.0);
        let offset = parabolic_offset(&[0.0, 0.75, 1.0, 0.5], 2);
        assert!((offset + 1.0 / 6.0).abs() < 1e-5, "got {}", offset);
        assert_eq!(parabolic_offset(&[1.0, 0.5], 1), 0.0);
    }
}
