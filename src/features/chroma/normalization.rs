//! Chroma normalization strategies

/// Scale so the largest bin is 1.0; vectors with a zero maximum are left as is
pub fn normalize_max(chroma: &mut [f32; 12]) {
    let max = chroma.iter().copied().fold(0.0f32, f32::max);
    if max > f32::EPSILON {
        chroma.iter_mut().for_each(|v| *v /= max);
    }
}

/// Divide by the bin sum plus `epsilon`
pub fn normalize_l1(chroma: &mut [f32; 12], epsilon: f32) {
    let sum: f32 = chroma.iter().map(|v| v.abs()).sum();
    chroma.iter_mut().for_each(|v| *v /= sum + epsilon);
}

/// Divide by the Euclidean norm plus `epsilon`
pub fn normalize_l2(chroma: &mut [f32; 12], epsilon: f32) {
    let norm = chroma.iter().map(|v| v * v).sum::<f32>().sqrt();
    chroma.iter_mut().for_each(|v| *v /= norm + epsilon);
}
