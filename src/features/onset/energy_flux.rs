//! Energy flux onset detection
//!
//! Detects onsets by finding peaks in the frame-by-frame energy rise.
//!
//! Algorithm:
//! 1. RMS energy of centered frames (`frame_size`, `hop_size`)
//! 2. Positive flux: `E_flux[n] = max(0, E[n] - E[n-1])`
//! 3. Threshold relative to the strongest flux, in dB
//! 4. Local-maximum peak picking
//!
//! # Reference
//!
//! Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
//! A Tutorial on Onset Detection in Music Signals.
//! *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.
//!
//! # Example
//!
//! ```no_run
//! use tonic_dsp::features::onset::energy_flux::detect_energy_flux_onsets;
//!
//! let samples = vec![0.0f32; 22050 * 30]; // 30 seconds of audio
//! let onsets = detect_energy_flux_onsets(&samples, 2048, 512, -20.0)?;
//! println!("Found {} onsets", onsets.len());
//! # Ok::<(), tonic_dsp::AnalysisError>(())
//! ```

use crate::error::AnalysisError;
use crate::preprocessing::stft::frame_count;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// RMS of every centered frame (zero padded by half a frame on both sides)
///
/// Frame `i` is centered on sample `i * hop_size`; a signal of `n` samples
/// yields `n / hop_size + 1` frames.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero frame or hop size
pub fn frame_rms(samples: &[f32], frame_size: usize, hop_size: usize) -> Result<Vec<f32>, AnalysisError> {
    if frame_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Frame size must be > 0".to_string(),
        ));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Hop size must be > 0".to_string(),
        ));
    }

    let pad = frame_size / 2;
    let n_frames = frame_count(samples.len(), hop_size);

    Ok((0..n_frames)
        .map(|i| {
            let center = i * hop_size;
            let start = center.saturating_sub(pad).min(samples.len());
            let end = (center + frame_size - pad).min(samples.len());
            let sum_sq: f32 = samples[start..end].iter().map(|&x| x * x).sum();
            (sum_sq / frame_size as f32).sqrt()
        })
        .collect())
}

/// Detect onsets using the energy flux method
///
/// # Arguments
///
/// * `samples` - Audio samples (mono, normalized to [-1.0, 1.0])
/// * `frame_size` - Frame size for analysis (typically 2048)
/// * `hop_size` - Hop size between frames (typically 512)
/// * `threshold_db` - Threshold in dB relative to maximum flux (typically -20 to -30 dB)
///
/// # Returns
///
/// Onset positions in samples (frame centers), sorted by time
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `frame_size` or `hop_size` is zero
pub fn detect_energy_flux_onsets(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
    threshold_db: f32,
) -> Result<Vec<usize>, AnalysisError> {
    let energies = frame_rms(samples, frame_size, hop_size)?;
    if energies.len() < 2 {
        return Ok(Vec::new());
    }

    // flux[i] is the rise into frame i + 1
    let flux: Vec<f32> = energies
        .windows(2)
        .map(|w| (w[1] - w[0]).max(0.0))
        .collect();

    let max_flux = flux.iter().copied().fold(0.0f32, f32::max);
    if max_flux <= EPSILON {
        log::debug!("No positive energy flux, no onsets detected");
        return Ok(Vec::new());
    }

    let threshold = max_flux * 10.0_f32.powf(threshold_db / 20.0);
    log::debug!(
        "Energy flux: {} frames, max={:.6}, threshold={:.6} ({:.1} dB)",
        energies.len(),
        max_flux,
        threshold,
        threshold_db
    );

    let onsets: Vec<usize> = pick_peaks(&flux, threshold)
        .into_iter()
        .map(|i| (i + 1) * hop_size)
        .filter(|&pos| pos < samples.len())
        .collect();

    log::debug!("Energy flux detected {} onsets", onsets.len());
    Ok(onsets)
}

/// Indices of local maxima above `threshold`
///
/// A peak rises strictly from its left neighbour and does not fall below its
/// right neighbour's value, so plateaus report their first index only. The
/// boundaries compare against their single neighbour.
fn pick_peaks(values: &[f32], threshold: f32) -> Vec<usize> {
    let n = values.len();
    (0..n)
        .filter(|&i| {
            let v = values[i];
            let left_ok = i == 0 || v > values[i - 1];
            let right_ok = i + 1 == n || v >= values[i + 1];
            v > threshold && left_ok && right_ok
        })
        .collect()
}
