//! Profile correlation
//!
//! Scores a pitch-class vector against all 24 keys: Pearson correlation with
//! each template rotated to each tonic, blended across templates by weight.

use super::templates::ProfileStore;
use crate::analysis::result::Key;

/// Weighted correlation scores for all 24 keys
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyScores {
    /// Major key scores, index = tonic
    pub major: [f32; 12],

    /// Minor key scores, index = tonic
    pub minor: [f32; 12],
}

impl KeyScores {
    /// Score of one key
    pub fn score(&self, key: Key) -> f32 {
        match key {
            Key::Major(_) => self.major[key.tonic() as usize],
            Key::Minor(_) => self.minor[key.tonic() as usize],
        }
    }

    /// Best major key and its score (lowest tonic wins ties)
    pub fn best_major(&self) -> (Key, f32) {
        let (tonic, score) = argmax(&self.major);
        (Key::Major(tonic as u32), score)
    }

    /// Best minor key and its score (lowest tonic wins ties)
    pub fn best_minor(&self) -> (Key, f32) {
        let (tonic, score) = argmax(&self.minor);
        (Key::Minor(tonic as u32), score)
    }

    /// All 24 candidates sorted by score, highest first
    ///
    /// The sort is stable over the order C..B major then C..B minor, so equal
    /// scores list major before minor and lower tonics first.
    pub fn ranked(&self) -> Vec<(Key, f32)> {
        let mut all: Vec<(Key, f32)> = (0..12u32)
            .map(|i| (Key::Major(i), self.major[i as usize]))
            .chain((0..12u32).map(|i| (Key::Minor(i), self.minor[i as usize])))
            .collect();
        all.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        all
    }
}

/// Index and value of the first maximum
fn argmax(values: &[f32; 12]) -> (usize, f32) {
    let mut best = (0, values[0]);
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

/// Pearson correlation coefficient of two 12-bin vectors
///
/// Returns 0.0 when either side has (near) zero variance.
pub fn pearson(x: &[f32; 12], y: &[f32; 12]) -> f32 {
    let x_mean = x.iter().sum::<f32>() / 12.0;
    let y_mean = y.iter().sum::<f32>() / 12.0;

    let mut num = 0.0f32;
    let mut x_sq = 0.0f32;
    let mut y_sq = 0.0f32;
    for i in 0..12 {
        let xd = x[i] - x_mean;
        let yd = y[i] - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    num / denom
}

/// Correlate a pitch-class vector with every rotation of every template
///
/// # Arguments
///
/// * `pitch_classes` - 12-bin pitch-class vector (index 0 = C)
/// * `store` - Validated template store
///
/// # Returns
///
/// Weighted sum of correlations per key: `Σ weight · r(pitch_classes, rotated template)`
pub fn correlate(pitch_classes: &[f32; 12], store: &ProfileStore) -> KeyScores {
    let mut scores = KeyScores {
        major: [0.0; 12],
        minor: [0.0; 12],
    };

    for template in store.templates() {
        for tonic in 0..12 {
            scores.major[tonic] +=
                template.weight * pearson(pitch_classes, &template.rotated_major(tonic));
            scores.minor[tonic] +=
                template.weight * pearson(pitch_classes, &template.rotated_minor(tonic));
        }
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::key::templates::ToneTemplate;

    #[test]
    fn test_pearson_identical_and_flat() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-5);

        let flat = [0.5f32; 12];
        assert_eq!(pearson(&a, &flat), 0.0, "zero variance must give 0.0");
        assert_eq!(pearson(&[0.0; 12], &a), 0.0);
    }

    #[test]
    fn test_rotated_template_ranks_its_own_key_first() {
        let store = ProfileStore::standard().unwrap();
        for t in store.templates() {
            for k in 0..12 {
                // Single-template store so the input is exactly the rotated profile
                let single = ProfileStore::from_templates(vec![ToneTemplate::new(
                    t.name.clone(),
                    t.major,
                    t.minor,
                    1.0,
                )])
                .unwrap();

                let scores = correlate(&t.rotated_major(k), &single);
                let (best, score) = scores.best_major();
                assert_eq!(best, Key::Major(k as u32), "{} major rotated by {}", t.name, k);
                assert!((score - 1.0).abs() < 1e-4);

                let scores = correlate(&t.rotated_minor(k), &single);
                let (best, score) = scores.best_minor();
                assert_eq!(best, Key::Minor(k as u32), "{} minor rotated by {}", t.name, k);
                assert!((score - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_silent_vector_scores_zero() {
        let store = ProfileStore::standard().unwrap();
        let scores = correlate(&[0.0; 12], &store);
        assert!(scores.major.iter().chain(scores.minor.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_ranked_is_stable_on_ties() {
        let scores = KeyScores {
            major: [0.0; 12],
            minor: [0.0; 12],
        };
        let ranked = scores.ranked();
        assert_eq!(ranked.len(), 24);
        assert_eq!(ranked[0].0, Key::Major(0));
        assert_eq!(ranked[11].0, Key::Major(11));
        assert_eq!(ranked[12].0, Key::Minor(0));
        assert_eq!(scores.best_major().0, Key::Major(0));
    }

    #[test]
    fn test_ranked_descending_and_score_lookup() {
        let mut scores = KeyScores {
            major: [0.1; 12],
            minor: [0.2; 12],
        };
        scores.minor[9] = 0.9;
        scores.major[0] = 0.8;
        let ranked = scores.ranked();
        assert_eq!(ranked[0].0, Key::Minor(9));
        assert_eq!(ranked[1].0, Key::Major(0));
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(scores.score(Key::Minor(9)), 0.9);
    }
}
