//! Auxiliary track descriptors: tempo, energy and brightness
//!
//! These are computed independently of key detection and attached to the
//! result. They never fail an analysis: a failing descriptor is logged and
//! reported as 0.0.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::onset::energy_flux::{detect_energy_flux_onsets, frame_rms};
use crate::features::period::autocorrelation::estimate_bpm_from_autocorrelation;
use crate::preprocessing::stft::for_each_frame;

/// Tempo, energy and brightness of a track
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Descriptors {
    /// Tempo in BPM, 0.0 if none was found
    pub tempo: f32,

    /// Mean frame RMS
    pub energy: f32,

    /// Mean spectral centroid in Hz
    pub brightness: f32,
}

/// Mean frame RMS
pub fn mean_energy(samples: &[f32], frame_size: usize, hop_size: usize) -> Result<f32, AnalysisError> {
    let rms = frame_rms(samples, frame_size, hop_size)?;
    Ok(mean(&rms))
}

/// Mean spectral centroid in Hz; silent frames contribute 0
pub fn mean_spectral_centroid(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
) -> Result<f32, AnalysisError> {
    let bin_hz = sample_rate as f32 / frame_size as f32;
    let mut total = 0.0f64;

    let n_frames = for_each_frame(samples, frame_size, hop_size, |_, bins| {
        let mut weighted = 0.0f32;
        let mut mass = 0.0f32;
        for (k, c) in bins.iter().enumerate() {
            let m = c.norm();
            weighted += k as f32 * bin_hz * m;
            mass += m;
        }
        if mass > 1e-10 {
            total += (weighted / mass) as f64;
        }
    })?;

    if n_frames == 0 {
        return Ok(0.0);
    }
    Ok((total / n_frames as f64) as f32)
}

/// Tempo from energy-flux onsets and onset autocorrelation
///
/// # Returns
///
/// Best BPM candidate in `[min_bpm, max_bpm]`, or 0.0 if there is none
pub fn estimate_tempo(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<f32, AnalysisError> {
    let onsets = detect_energy_flux_onsets(
        samples,
        config.frame_size,
        config.hop_size,
        config.onset_threshold_db,
    )?;

    if onsets.len() < 2 {
        log::debug!("Only {} onsets, no tempo", onsets.len());
        return Ok(0.0);
    }

    let candidates = estimate_bpm_from_autocorrelation(
        &onsets,
        sample_rate,
        config.hop_size,
        config.min_bpm,
        config.max_bpm,
    )?;

    Ok(candidates.first().map(|c| c.bpm).unwrap_or(0.0))
}

/// Compute all descriptors; failures are logged and reported as 0.0
pub fn compute_descriptors(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Descriptors {
    let tempo = estimate_tempo(samples, sample_rate, config).unwrap_or_else(|e| {
        log::warn!("Tempo estimation failed: {}", e);
        0.0
    });
    let energy = mean_energy(samples, config.frame_size, config.hop_size).unwrap_or_else(|e| {
        log::warn!("Energy computation failed: {}", e);
        0.0
    });
    let brightness = mean_spectral_centroid(samples, sample_rate, config.frame_size, config.hop_size)
        .unwrap_or_else(|e| {
            log::warn!("Brightness computation failed: {}", e);
            0.0
        });

    log::debug!(
        "Descriptors: tempo={:.1} BPM, energy={:.4}, brightness={:.1} Hz",
        tempo,
        energy,
        brightness
    );

    Descriptors {
        tempo,
        energy,
        brightness,
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
