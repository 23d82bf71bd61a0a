//! Constant-Q style chroma
//!
//! A long FFT gives enough frequency resolution to separate semitones down to
//! C2. Each semitone band is a Gaussian in log-frequency with a fixed width in
//! semitones, so bandwidth grows proportionally with center frequency the way a
//! constant-Q transform's does. Bands are folded onto 12 pitch classes.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::preprocessing::stft::for_each_frame;

/// Bands extend this many semitones either side of their center
const BAND_REACH_SEMITONES: f32 = 1.0;

/// One non-zero filterbank coefficient: FFT bin, pitch class, weight
#[derive(Debug, Clone, Copy)]
struct BandWeight {
    bin: usize,
    pitch_class: usize,
    weight: f32,
}

/// Sparse semitone filterbank folded onto pitch classes
#[derive(Debug, Clone)]
pub struct SemitoneFilterbank {
    weights: Vec<BandWeight>,
    fft_size: usize,
}

impl SemitoneFilterbank {
    /// Build the filterbank for MIDI notes `min_midi .. min_midi + 12 * octaves`
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz
    /// * `fft_size` - FFT size (default: 8192)
    /// * `min_midi` - Lowest MIDI note (default: 36, C2)
    /// * `octaves` - Octaves covered (default: 6)
    /// * `sigma` - Gaussian width in semitones (default: 0.35)
    pub fn new(sample_rate: u32, fft_size: usize, min_midi: u8, octaves: u8, sigma: f32) -> Self {
        let min_note = min_midi as f32;
        let max_note = min_midi as f32 + 12.0 * octaves as f32 - 1.0;
        let nyquist_bin = fft_size / 2;
        let bin_hz = sample_rate as f32 / fft_size as f32;

        let mut weights = Vec::new();
        for bin in 1..=nyquist_bin {
            let freq = bin as f32 * bin_hz;
            let note = 69.0 + 12.0 * (freq / 440.0).log2();
            if note < min_note - BAND_REACH_SEMITONES || note > max_note + BAND_REACH_SEMITONES {
                continue;
            }

            let lo = (note - BAND_REACH_SEMITONES).ceil().max(min_note) as i32;
            let hi = (note + BAND_REACH_SEMITONES).floor().min(max_note) as i32;
            for center in lo..=hi {
                let d = (note - center as f32) / sigma;
                weights.push(BandWeight {
                    bin,
                    pitch_class: center.rem_euclid(12) as usize,
                    weight: (-0.5 * d * d).exp(),
                });
            }
        }

        Self { weights, fft_size }
    }

    /// FFT size this filterbank was built for
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Fold one magnitude spectrum onto 12 pitch classes
    pub fn apply(&self, magnitude: &[f32]) -> [f32; 12] {
        let mut chroma = [0.0f32; 12];
        for w in &self.weights {
            if let Some(m) = magnitude.get(w.bin) {
                chroma[w.pitch_class] += m * w.weight;
            }
        }
        chroma
    }
}

/// Un-normalized constant-Q style chroma, one frame per hop
///
/// Frames sit on the shared centered grid (`len / hop + 1` frames), so they
/// align with the STFT chroma despite the longer FFT.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for invalid FFT or hop sizes
pub fn constant_q_chroma(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<Vec<[f32; 12]>, AnalysisError> {
    let bank = SemitoneFilterbank::new(
        sample_rate,
        config.constant_q_fft_size,
        config.constant_q_min_midi,
        config.constant_q_octaves,
        config.constant_q_sigma,
    );

    let mut frames = Vec::new();
    let mut magnitude = vec![0.0f32; bank.fft_size() / 2 + 1];
    for_each_frame(samples, bank.fft_size(), config.hop_size, |_, bins| {
        for (m, c) in magnitude.iter_mut().zip(bins.iter()) {
            *m = c.norm();
        }
        frames.push(bank.apply(&magnitude));
    })?;

    log::debug!(
        "Constant-Q chroma: {} frames, fft={}, notes {}..{}",
        frames.len(),
        config.constant_q_fft_size,
        config.constant_q_min_midi,
        config.constant_q_min_midi as u32 + 12 * config.constant_q_octaves as u32
    );

    Ok(frames)
}
