//! Chroma Energy Normalized Statistics (CENS)
//!
//! Coarse, smoothed chroma that is robust to dynamics and articulation.
//!
//! # Reference
//!
//! Müller, M., Kurth, F., & Clausen, M. (2005). Audio Matching via Chroma-Based
//! Statistical Features. *Proceedings of the International Conference on Music
//! Information Retrieval (ISMIR)*.

use super::normalization::{normalize_l1, normalize_l2};
use super::smoothing::hann_smooth;

/// Quantization steps: each threshold a bin exceeds adds 0.25
const QUANT_THRESHOLDS: [f32; 4] = [0.4, 0.2, 0.1, 0.05];
const QUANT_STEP: f32 = 0.25;

/// Normalization regularizer
const EPSILON: f32 = 1e-8;

/// Quantize an L1-normalized chroma value to {0, 0.25, 0.5, 0.75, 1.0}
pub fn quantize(value: f32) -> f32 {
    QUANT_THRESHOLDS
        .iter()
        .filter(|&&t| value > t)
        .count() as f32
        * QUANT_STEP
}

/// CENS frames from un-normalized chroma frames
///
/// Per frame: L1 normalize, quantize; then Hann smoothing over
/// `smoothing_window` frames and per-frame L2 normalization.
pub fn cens(raw_frames: &[[f32; 12]], smoothing_window: usize) -> Vec<[f32; 12]> {
    let quantized: Vec<[f32; 12]> = raw_frames
        .iter()
        .map(|frame| {
            let mut f = *frame;
            normalize_l1(&mut f, EPSILON);
            f.iter_mut().for_each(|v| *v = quantize(*v));
            f
        })
        .collect();

    let mut smoothed = hann_smooth(&quantized, smoothing_window);
    for frame in smoothed.iter_mut() {
        normalize_l2(frame, EPSILON);
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_steps() {
        assert_eq!(quantize(0.0), 0.0);
        assert_eq!(quantize(0.06), 0.25);
        assert_eq!(quantize(0.15), 0.5);
        assert_eq!(quantize(0.3), 0.75);
        assert_eq!(quantize(0.9), 1.0);
    }

    #[test]
    fn test_cens_frames_are_unit_norm() {
        let mut frame = [0.01f32; 12];
        frame[0] = 1.0;
        frame[7] = 0.5;
        let frames = vec![frame; 60];
        let out = cens(&frames, 41);
        assert_eq!(out.len(), 60);

        let norm = out[30].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "L2 norm should be 1, got {}", norm);
        assert!(out[30][0] > out[30][7], "dominant bin should stay dominant");
        assert_eq!(out[30][3], 0.0, "weak bins quantize to zero");
    }

    #[test]
    fn test_cens_silence_stays_zero() {
        let out = cens(&vec![[0.0f32; 12]; 10], 41);
        assert!(out.iter().flatten().all(|&v| v == 0.0));
    }
}
