//! Pitch-class vector extraction
//!
//! Turns a waveform into one 12-bin pitch-class vector:
//!
//! 1. Keep the harmonic component (HPSS)
//! 2. Compute three chroma time series on the same frame grid:
//!    constant-Q style, STFT and CENS
//! 3. Blend them per frame with the configured weights
//! 4. Collapse time by per-bin median
//! 5. L1 normalize

use super::cens::cens;
use super::cqt::constant_q_chroma;
use super::normalization::{normalize_l1, normalize_max};
use super::smoothing::median_over_time;
use crate::config::{AnalysisConfig, ChromaWeights};
use crate::error::AnalysisError;
use crate::preprocessing::hpss::harmonic_component;
use crate::preprocessing::stft::for_each_frame;

/// Regularizer of the final L1 normalization
pub const L1_EPSILON: f32 = 1e-8;

/// Soft pitch-class mapping of STFT bins
///
/// Every bin at or above `min_frequency` spreads its power over the 12 pitch
/// classes with a circular Gaussian centered on its fractional pitch class.
#[derive(Debug, Clone)]
pub struct SoftChromaMap {
    /// `[bin][pitch_class]` weights; bins below the minimum frequency are all zero
    weights: Vec<[f32; 12]>,
}

impl SoftChromaMap {
    /// Build the mapping for a `frame_size`-point FFT
    pub fn new(sample_rate: u32, frame_size: usize, min_frequency: f32, sigma: f32) -> Self {
        let n_bins = frame_size / 2 + 1;
        let bin_hz = sample_rate as f32 / frame_size as f32;

        let weights = (0..n_bins)
            .map(|bin| {
                let mut w = [0.0f32; 12];
                let freq = bin as f32 * bin_hz;
                if bin == 0 || freq < min_frequency {
                    return w;
                }
                let pitch = (69.0 + 12.0 * (freq / 440.0).log2()).rem_euclid(12.0);
                for (pc, slot) in w.iter_mut().enumerate() {
                    let diff = (pitch - pc as f32).abs();
                    let d = diff.min(12.0 - diff) / sigma;
                    *slot = (-0.5 * d * d).exp();
                }
                w
            })
            .collect();

        Self { weights }
    }

    /// Fold one power spectrum onto 12 pitch classes
    pub fn apply(&self, power: &[f32]) -> [f32; 12] {
        let mut chroma = [0.0f32; 12];
        for (p, w) in power.iter().zip(self.weights.iter()) {
            if *p == 0.0 {
                continue;
            }
            for (c, wc) in chroma.iter_mut().zip(w.iter()) {
                *c += p * wc;
            }
        }
        chroma
    }
}

/// STFT chroma, per-frame max-normalized
pub fn stft_chroma(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<Vec<[f32; 12]>, AnalysisError> {
    let map = SoftChromaMap::new(
        sample_rate,
        config.frame_size,
        config.chroma_min_frequency,
        config.soft_mapping_sigma,
    );

    let mut frames = Vec::new();
    let mut power = vec![0.0f32; config.frame_size / 2 + 1];
    for_each_frame(samples, config.frame_size, config.hop_size, |_, bins| {
        for (p, c) in power.iter_mut().zip(bins.iter()) {
            *p = c.norm_sqr();
        }
        let mut chroma = map.apply(&power);
        normalize_max(&mut chroma);
        frames.push(chroma);
    })?;
    Ok(frames)
}

/// Weighted per-frame blend of the three chroma series
///
/// Series are truncated to the shortest one (they normally share one length).
pub fn blend_chroma(
    constant_q: &[[f32; 12]],
    stft: &[[f32; 12]],
    cens: &[[f32; 12]],
    weights: ChromaWeights,
) -> Vec<[f32; 12]> {
    constant_q
        .iter()
        .zip(stft.iter())
        .zip(cens.iter())
        .map(|((q, s), c)| {
            let mut out = [0.0f32; 12];
            for i in 0..12 {
                out[i] = weights.constant_q * q[i] + weights.stft * s[i] + weights.cens * c[i];
            }
            out
        })
        .collect()
}

/// Extract the pitch-class vector of a waveform
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Analysis configuration (STFT, HPSS and chroma parameters)
///
/// # Returns
///
/// 12-bin pitch-class vector (index 0 = C), non-negative and L1 normalized.
/// Silent input yields all zeros.
///
/// # Errors
///
/// Returns `AnalysisError` if the input is empty or a size parameter is invalid
///
/// # Example
///
/// ```no_run
/// use tonic_dsp::features::chroma::extractor::extract_pitch_class_vector;
/// use tonic_dsp::AnalysisConfig;
///
/// let samples = vec![0.0f32; 22050 * 5];
/// let pcv = extract_pitch_class_vector(&samples, 22050, &AnalysisConfig::default())?;
/// assert_eq!(pcv.len(), 12);
/// # Ok::<(), tonic_dsp::AnalysisError>(())
/// ```
pub fn extract_pitch_class_vector(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<[f32; 12], AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }

    let harmonic = harmonic_component(
        samples,
        config.frame_size,
        config.hop_size,
        config.hpss_kernel_size,
        config.hpss_margin,
    )?;

    let raw_constant_q = constant_q_chroma(&harmonic, sample_rate, config)?;
    let cens_frames = cens(&raw_constant_q, config.cens_smoothing_window);
    let constant_q: Vec<[f32; 12]> = raw_constant_q
        .into_iter()
        .map(|mut f| {
            normalize_max(&mut f);
            f
        })
        .collect();
    let stft_frames = stft_chroma(&harmonic, sample_rate, config)?;

    let blended = blend_chroma(&constant_q, &stft_frames, &cens_frames, config.chroma_weights);
    let mut pcv = median_over_time(&blended);
    normalize_l1(&mut pcv, L1_EPSILON);

    log::debug!(
        "Pitch-class vector from {} frames: [{}]",
        blended.len(),
        pcv.iter()
            .map(|v| format!("{:.3}", v))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(pcv)
}
