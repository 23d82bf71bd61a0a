//! Short-time Fourier transform helpers
//!
//! All spectral features share one frame grid: frames are centered on
//! `frame_index * hop_size` (the signal is zero padded by half a frame on
//! both sides) and a signal of `n` samples yields `n / hop_size + 1` frames.

use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Periodic Hann window of the given size
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()
        })
        .collect()
}

/// Number of centered frames for a signal of `len` samples
pub fn frame_count(len: usize, hop_size: usize) -> usize {
    len / hop_size + 1
}

fn check_sizes(frame_size: usize, hop_size: usize) -> Result<(), AnalysisError> {
    if frame_size < 2 || hop_size == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid STFT sizes: frame={}, hop={}",
            frame_size, hop_size
        )));
    }
    Ok(())
}

/// Run a windowed FFT over every centered frame and hand the positive-frequency
/// half (`frame_size / 2 + 1` bins) to `visit`
///
/// Frames are produced one at a time, so long FFT sizes do not require the
/// whole spectrogram in memory.
///
/// # Returns
///
/// Number of frames visited
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero hop or a frame smaller than 2
pub fn for_each_frame<F>(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
    mut visit: F,
) -> Result<usize, AnalysisError>
where
    F: FnMut(usize, &[Complex<f32>]),
{
    check_sizes(frame_size, hop_size)?;

    let window = hann_window(frame_size);
    let pad = frame_size / 2;
    let n_frames = frame_count(samples.len(), hop_size);
    let n_bins = frame_size / 2 + 1;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_size);
    let mut buffer = vec![Complex::new(0.0, 0.0); frame_size];

    for frame_idx in 0..n_frames {
        let start = frame_idx * hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            // Position in the unpadded signal
            let x = (start + i)
                .checked_sub(pad)
                .and_then(|pos| samples.get(pos))
                .copied()
                .unwrap_or(0.0);
            *slot = Complex::new(x * window[i], 0.0);
        }
        fft.process(&mut buffer);
        visit(frame_idx, &buffer[..n_bins]);
    }

    Ok(n_frames)
}

/// Complex spectrogram, indexed `[frame][bin]`
pub fn stft(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<Vec<Complex<f32>>>, AnalysisError> {
    let mut frames = Vec::with_capacity(frame_count(samples.len(), hop_size.max(1)));
    for_each_frame(samples, frame_size, hop_size, |_, bins| frames.push(bins.to_vec()))?;
    Ok(frames)
}

/// Invert a centered spectrogram by windowed overlap-add
///
/// Each frame is inverse transformed, multiplied by the synthesis window and
/// added at its position; the sum is divided by the accumulated squared window.
///
/// # Arguments
///
/// * `frames` - Positive-frequency bins per frame, as produced by [`stft`]
/// * `frame_size` - FFT size used for analysis
/// * `hop_size` - Hop size used for analysis
/// * `length` - Length of the original signal in samples
pub fn istft(
    frames: &[Vec<Complex<f32>>],
    frame_size: usize,
    hop_size: usize,
    length: usize,
) -> Result<Vec<f32>, AnalysisError> {
    check_sizes(frame_size, hop_size)?;

    let n_bins = frame_size / 2 + 1;
    if let Some(bad) = frames.iter().find(|f| f.len() != n_bins) {
        return Err(AnalysisError::ProcessingError(format!(
            "Spectrogram frame has {} bins, expected {}",
            bad.len(),
            n_bins
        )));
    }

    let window = hann_window(frame_size);
    let pad = frame_size / 2;
    let padded_len = frames.len().saturating_sub(1) * hop_size + frame_size;
    let mut output = vec![0.0f32; padded_len];
    let mut window_sum = vec![0.0f32; padded_len];

    let mut planner = FftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(frame_size);
    let mut buffer = vec![Complex::new(0.0, 0.0); frame_size];
    let scale = 1.0 / frame_size as f32;

    for (frame_idx, frame) in frames.iter().enumerate() {
        // Rebuild the Hermitian spectrum from its positive half
        buffer[..n_bins].copy_from_slice(frame);
        for k in 1..(frame_size - n_bins + 1) {
            buffer[frame_size - k] = frame[k].conj();
        }
        ifft.process(&mut buffer);

        let start = frame_idx * hop_size;
        for i in 0..frame_size {
            output[start + i] += buffer[i].re * scale * window[i];
            window_sum[start + i] += window[i] * window[i];
        }
    }

    for (y, &w) in output.iter_mut().zip(window_sum.iter()) {
        if w > 1e-8 {
            *y /= w;
        }
    }

    let mut signal: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
    signal.resize(length, 0.0);
    Ok(signal)
}
