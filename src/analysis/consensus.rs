//! Consensus between the single-pass and segment-voted key estimates
//!
//! Resolution rules, in order (c₁ single pass, c₂ segment voting):
//!
//! 1. `c₁ > dominance · c₂` → single-pass estimate as is
//! 2. `c₂ > dominance · c₁` → segment-voted estimate as is
//! 3. same key → that key with `mean(c₁, c₂) · agreement_bonus`
//! 4. otherwise the more confident estimate (single pass on exact ties) with
//!    `· disagreement_penalty`
//!
//! After resolution a quiet track (mean RMS below the threshold) has its
//! confidence scaled by the quiet penalty.

use crate::analysis::result::{round_to, AlternativeKey, AnalysisResult, Key};
use crate::config::AnalysisConfig;
use crate::features::descriptors::Descriptors;
use crate::features::key::{KeyEstimate, KeyScores};

/// Regularizer of relative alternative confidences
const EPSILON: f32 = 1e-8;

/// Reconcile the two estimates into one
pub fn resolve(single: KeyEstimate, segment: KeyEstimate, config: &AnalysisConfig) -> KeyEstimate {
    let (c1, c2) = (single.confidence, segment.confidence);

    let resolved = if c1 > config.dominance_ratio * c2 {
        single
    } else if c2 > config.dominance_ratio * c1 {
        segment
    } else if single.key == segment.key {
        KeyEstimate {
            key: single.key,
            confidence: 0.5 * (c1 + c2) * config.agreement_bonus,
        }
    } else {
        let chosen = if c2 > c1 { segment } else { single };
        KeyEstimate {
            key: chosen.key,
            confidence: chosen.confidence * config.disagreement_penalty,
        }
    };

    log::debug!(
        "Consensus: single {} ({:.3}), segments {} ({:.3}) -> {} ({:.3})",
        single.key.name(),
        c1,
        segment.key.name(),
        c2,
        resolved.key.name(),
        resolved.confidence
    );

    resolved
}

/// Scale the confidence of quiet tracks
pub fn apply_quiet_penalty(confidence: f32, energy: f32, config: &AnalysisConfig) -> f32 {
    if energy < config.quiet_energy_threshold {
        log::debug!(
            "Quiet track (energy {:.4}), confidence x{:.2}",
            energy,
            config.quiet_penalty
        );
        confidence * config.quiet_penalty
    } else {
        confidence
    }
}

/// Runner-up keys from the single-pass scores
///
/// Candidates are ranked by score (ties: major before minor, lower tonic first),
/// the chosen key is skipped and the next `count` are reported with their
/// score relative to the chosen key's score.
pub fn alternatives(scores: &KeyScores, chosen: Key, count: usize) -> Vec<AlternativeKey> {
    let main = scores.score(chosen);
    scores
        .ranked()
        .into_iter()
        .filter(|(key, _)| *key != chosen)
        .take(count)
        .map(|(key, score)| AlternativeKey {
            label: key.name(),
            relative_confidence: round_to(score / (main + EPSILON), 3),
        })
        .collect()
}

/// Assemble the final result of one track
///
/// # Arguments
///
/// * `single` - Single-pass estimate
/// * `segment` - Segment-voted estimate
/// * `scores` - Single-pass key scores (for alternatives)
/// * `descriptors` - Tempo, energy and brightness of the track
/// * `config` - Calibration constants
pub fn build_result(
    single: KeyEstimate,
    segment: KeyEstimate,
    scores: &KeyScores,
    descriptors: &Descriptors,
    config: &AnalysisConfig,
) -> AnalysisResult {
    let resolved = resolve(single, segment, config);
    let confidence = apply_quiet_penalty(resolved.confidence, descriptors.energy, config);
    let key = resolved.key;

    AnalysisResult {
        key: key.tonic_name().to_string(),
        mode: key.mode(),
        confidence: round_to(confidence, 3),
        scale: key.scale_label(),
        relative_key: key.relative_label(),
        tempo: round_to(descriptors.tempo, 1),
        energy: round_to(descriptors.energy, 3),
        brightness: round_to(descriptors.brightness, 1),
        alternatives: alternatives(scores, key, config.alternative_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::Mode;

    fn est(key: Key, confidence: f32) -> KeyEstimate {
        KeyEstimate { key, confidence }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn test_dominant_single_pass_wins_unchanged() {
        let r = resolve(est(Key::Major(0), 0.7), est(Key::Minor(9), 0.5), &config());
        assert_eq!(r, est(Key::Major(0), 0.7));
    }

    #[test]
    fn test_dominant_segment_vote_wins_unchanged() {
        let r = resolve(est(Key::Major(0), 0.4), est(Key::Major(9), 0.5), &config());
        assert_eq!(r, est(Key::Major(9), 0.5));
    }

    #[test]
    fn test_agreement_bonus_may_exceed_one() {
        let r = resolve(est(Key::Minor(4), 0.95), est(Key::Minor(4), 0.97), &config());
        assert_eq!(r.key, Key::Minor(4));
        assert!((r.confidence - 0.96 * 1.1).abs() < 1e-5);
        assert!(r.confidence > 1.0);
    }

    #[test]
    fn test_disagreement_penalty_and_tie() {
        let r = resolve(est(Key::Major(0), 0.5), est(Key::Major(7), 0.55), &config());
        assert_eq!(r.key, Key::Major(7));
        assert!((r.confidence - 0.55 * 0.9).abs() < 1e-6);

        // Exact tie keeps the single-pass estimate
        let r = resolve(est(Key::Major(0), 0.5), est(Key::Major(7), 0.5), &config());
        assert_eq!(r.key, Key::Major(0));
        assert!((r.confidence - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_quiet_penalty() {
        assert!((apply_quiet_penalty(0.8, 0.005, &config()) - 0.56).abs() < 1e-6);
        assert_eq!(apply_quiet_penalty(0.8, 0.2, &config()), 0.8);
    }

    #[test]
    fn test_alternatives_skip_chosen_key() {
        let mut scores = KeyScores {
            major: [0.0; 12],
            minor: [0.0; 12],
        };
        scores.major[0] = 0.8;
        scores.minor[9] = 0.6;
        scores.major[7] = 0.4;
        scores.minor[6] = 0.2;

        let alts = alternatives(&scores, Key::Major(0), 3);
        assert_eq!(alts.len(), 3);
        assert_eq!(alts[0].label, "Am");
        assert_eq!(alts[0].relative_confidence, 0.75);
        assert_eq!(alts[1].label, "G");
        assert_eq!(alts[1].relative_confidence, 0.5);
        assert_eq!(alts[2].label, "F#m");
        assert_eq!(alts[2].relative_confidence, 0.25);
    }

    #[test]
    fn test_build_result_fields() {
        let mut scores = KeyScores {
            major: [0.1; 12],
            minor: [0.1; 12],
        };
        scores.minor[9] = 0.9;
        let descriptors = Descriptors {
            tempo: 121.04,
            energy: 0.12345,
            brightness: 1523.46,
        };

        let result = build_result(
            est(Key::Minor(9), 0.6),
            est(Key::Minor(9), 0.6),
            &scores,
            &descriptors,
            &config(),
        );

        assert_eq!(result.key, "A");
        assert_eq!(result.mode, Mode::Minor);
        assert_eq!(result.scale, "Am/C");
        assert_eq!(result.relative_key, "C major");
        assert_eq!(result.confidence, 0.66);
        assert_eq!(result.tempo, 121.0);
        assert_eq!(result.energy, 0.123);
        assert_eq!(result.brightness, 1523.5);
        assert_eq!(result.alternatives.len(), 3);
        assert_eq!(result.alternatives[0].label, "C");
    }

    #[test]
    fn test_build_result_scales_quiet_track() {
        let scores = KeyScores {
            major: [0.2; 12],
            minor: [0.1; 12],
        };
        let quiet = Descriptors {
            tempo: 0.0,
            energy: 0.004,
            brightness: 800.0,
        };
        let loud = Descriptors {
            energy: 0.2,
            ..quiet
        };

        let single = est(Key::Major(7), 0.5);
        let segment = est(Key::Major(7), 0.5);
        let resolved = resolve(single, segment, &config()).confidence;

        let quiet_result = build_result(single, segment, &scores, &quiet, &config());
        let loud_result = build_result(single, segment, &scores, &loud, &config());

        assert_eq!(loud_result.confidence, round_to(resolved, 3));
        assert_eq!(
            quiet_result.confidence,
            round_to(resolved * 0.7, 3),
            "quiet track should keep 70% of the resolved confidence"
        );
        assert_eq!(quiet_result.key, "G");
        assert_eq!(quiet_result.energy, 0.004);
    }
}
