//! Temporal chroma smoothing and aggregation

/// Smooth every chroma bin over time with a normalized Hann window
///
/// The window has `window_size` non-zero taps (a Hann of length
/// `window_size + 2` with its zero end points removed). Frames beyond the
/// signal count as zero, so output length equals input length.
///
/// # Arguments
///
/// * `frames` - Chroma frames in time order
/// * `window_size` - Number of taps (e.g., 41); 0 or 1 returns the input
pub fn hann_smooth(frames: &[[f32; 12]], window_size: usize) -> Vec<[f32; 12]> {
    if window_size <= 1 || frames.is_empty() {
        return frames.to_vec();
    }

    let n = window_size + 2;
    let taps: Vec<f32> = (1..=window_size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos())
        .collect();
    let total: f32 = taps.iter().sum();
    let taps: Vec<f32> = taps.iter().map(|t| t / total).collect();

    let half = window_size / 2;
    let len = frames.len();

    (0..len)
        .map(|t| {
            let mut out = [0.0f32; 12];
            for (j, &w) in taps.iter().enumerate() {
                // Tap j sits at offset j - half from the current frame
                let Some(src) = (t + j).checked_sub(half) else {
                    continue;
                };
                if src >= len {
                    break;
                }
                for (o, v) in out.iter_mut().zip(frames[src].iter()) {
                    *o += w * v;
                }
            }
            out
        })
        .collect()
}

/// Collapse chroma frames into one vector by per-bin median
///
/// For an even frame count the two middle values are averaged. No frames
/// yields all zeros.
pub fn median_over_time(frames: &[[f32; 12]]) -> [f32; 12] {
    let mut out = [0.0f32; 12];
    if frames.is_empty() {
        return out;
    }

    let mut column = Vec::with_capacity(frames.len());
    for (bin, slot) in out.iter_mut().enumerate() {
        column.clear();
        column.extend(frames.iter().map(|f| f[bin]));
        column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mid = column.len() / 2;
        *slot = if column.len() % 2 == 0 {
            0.5 * (column[mid - 1] + column[mid])
        } else {
            column[mid]
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: f32) -> [f32; 12] {
        [value; 12]
    }

    #[test]
    fn test_median_over_time_odd_and_even() {
        let frames = vec![frame(1.0), frame(5.0), frame(3.0)];
        assert_eq!(median_over_time(&frames), frame(3.0));

        let frames = vec![frame(1.0), frame(4.0), frame(2.0), frame(10.0)];
        assert_eq!(median_over_time(&frames), frame(3.0));

        assert_eq!(median_over_time(&[]), frame(0.0));
    }

    #[test]
    fn test_median_ignores_outlier_frames() {
        let mut frames = vec![frame(0.2); 9];
        frames[4] = frame(50.0);
        assert_eq!(median_over_time(&frames), frame(0.2));
    }

    #[test]
    fn test_hann_smooth_preserves_constant_interior() {
        let frames = vec![frame(1.0); 100];
        let smoothed = hann_smooth(&frames, 41);
        assert_eq!(smoothed.len(), 100);
        // Away from the edges the normalized kernel keeps a constant signal
        assert!((smoothed[50][0] - 1.0).abs() < 1e-4);
        // At the edges the zero extension pulls values down
        assert!(smoothed[0][0] < 1.0);
    }

    #[test]
    fn test_hann_smooth_spreads_impulse_symmetrically() {
        let mut frames = vec![frame(0.0); 21];
        frames[10] = frame(1.0);
        let smoothed = hann_smooth(&frames, 5);
        assert!((smoothed[9][0] - smoothed[11][0]).abs() < 1e-6);
        assert!(smoothed[10][0] > smoothed[9][0]);
        assert_eq!(smoothed[5][0], 0.0);
    }
}
