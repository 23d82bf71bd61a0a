//! Harmonic-percussive source separation (HPSS)
//!
//! Harmonic content is steady along time, percussive content is broadband
//! along frequency. Median filtering the magnitude spectrogram in each
//! direction enhances one and suppresses the other; a soft mask built from the
//! two enhanced spectrograms keeps the harmonic part of the signal.
//!
//! # Reference
//!
//! Fitzgerald, D. (2010). Harmonic/Percussive Separation using Median Filtering.
//! *Proceedings of the 13th International Conference on Digital Audio Effects (DAFx)*.

use super::stft::{istft, stft};
use crate::error::AnalysisError;

/// Mask regularizer
const EPSILON: f32 = 1e-10;

/// Separate the harmonic component of a signal
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `frame_size` - STFT frame size (default: 2048)
/// * `hop_size` - STFT hop size (default: 512)
/// * `kernel_size` - Median filter length in frames and bins (default: 31)
/// * `margin` - Harmonic margin; the percussive estimate is scaled by it in the mask (default: 1.0)
///
/// # Returns
///
/// Harmonic waveform with the same length as the input
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for invalid sizes
pub fn harmonic_component(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
    kernel_size: usize,
    margin: f32,
) -> Result<Vec<f32>, AnalysisError> {
    if kernel_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "HPSS kernel size must be > 0".to_string(),
        ));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let mut spectrum = stft(samples, frame_size, hop_size)?;
    let magnitude: Vec<Vec<f32>> = spectrum
        .iter()
        .map(|frame| frame.iter().map(|c| c.norm()).collect())
        .collect();

    let harmonic = median_filter_time(&magnitude, kernel_size);
    let percussive = median_filter_frequency(&magnitude, kernel_size);

    log::debug!(
        "HPSS: {} frames x {} bins, kernel={}, margin={:.2}",
        magnitude.len(),
        magnitude.first().map(|f| f.len()).unwrap_or(0),
        kernel_size,
        margin
    );

    for (t, frame) in spectrum.iter_mut().enumerate() {
        for (k, bin) in frame.iter_mut().enumerate() {
            *bin *= soft_mask(harmonic[t][k], percussive[t][k] * margin);
        }
    }

    istft(&spectrum, frame_size, hop_size, samples.len())
}

/// Soft (Wiener-style) mask of power 2 for the `keep` component
pub fn soft_mask(keep: f32, other: f32) -> f32 {
    let k = keep * keep;
    k / (k + other * other + EPSILON)
}

/// Median of `window`, which is reordered in place
fn median_in_place(window: &mut [f32]) -> f32 {
    let mid = window.len() / 2;
    let (_, m, _) =
        window.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    *m
}

/// Median along time for every bin; edges repeat the first/last frame
pub fn median_filter_time(magnitude: &[Vec<f32>], kernel_size: usize) -> Vec<Vec<f32>> {
    let n_frames = magnitude.len();
    if n_frames == 0 {
        return Vec::new();
    }
    let n_bins = magnitude[0].len();
    let half = kernel_size / 2;
    let mut out = vec![vec![0.0f32; n_bins]; n_frames];
    let mut window = vec![0.0f32; kernel_size];

    for k in 0..n_bins {
        for t in 0..n_frames {
            for (j, slot) in window.iter_mut().enumerate() {
                let src = (t + j).saturating_sub(half).min(n_frames - 1);
                *slot = magnitude[src][k];
            }
            out[t][k] = median_in_place(&mut window);
        }
    }
    out
}

/// Median along frequency for every frame; edges repeat the first/last bin
pub fn median_filter_frequency(magnitude: &[Vec<f32>], kernel_size: usize) -> Vec<Vec<f32>> {
    let half = kernel_size / 2;
    let mut window = vec![0.0f32; kernel_size];

    magnitude
        .iter()
        .map(|frame| {
            let n_bins = frame.len();
            (0..n_bins)
                .map(|k| {
                    for (j, slot) in window.iter_mut().enumerate() {
                        let src = (k + j).saturating_sub(half).min(n_bins - 1);
                        *slot = frame[src];
                    }
                    median_in_place(&mut window)
                })
                .collect()
        })
        .collect()
}
