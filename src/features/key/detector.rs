//! Key estimation strategies
//!
//! Two independent estimators over the same templates:
//!
//! - **Single pass**: one pitch-class vector for the whole (trimmed) waveform.
//! - **Segment voting**: one vote per fixed-length segment; tonic and mode are
//!   decided by confidence-weighted tallies.
//!
//! Both use the same confidence measure: how much of the combined evidence of
//! the best major and best minor key belongs to the winner.

use super::correlator::{correlate, KeyScores};
use super::templates::ProfileStore;
use super::KeyEstimate;
use crate::analysis::result::Key;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::chroma::extractor::extract_pitch_class_vector;

/// Ratio regularizer
const EPSILON: f32 = 1e-8;

/// Winner of a scored pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeDecision {
    /// Winning key
    pub key: Key,
    /// Score of the winning key
    pub winning: f32,
    /// Best score of the other mode
    pub competing: f32,
}

/// Pick the winning key: best major vs best minor, major on ties
pub fn decide_mode(scores: &KeyScores) -> ModeDecision {
    let (major, major_score) = scores.best_major();
    let (minor, minor_score) = scores.best_minor();

    if major_score >= minor_score {
        ModeDecision {
            key: major,
            winning: major_score,
            competing: minor_score,
        }
    } else {
        ModeDecision {
            key: minor,
            winning: minor_score,
            competing: major_score,
        }
    }
}

/// `w / (w + c + ε)` with negative scores floored at zero, so the result is in [0, 1]
pub fn ratio_confidence(winning: f32, competing: f32) -> f32 {
    let w = winning.max(0.0);
    let c = competing.max(0.0);
    w / (w + c + EPSILON)
}

/// Estimate from precomputed scores, optionally with the near-tie penalty
pub fn estimate_from_scores(
    scores: &KeyScores,
    config: &AnalysisConfig,
    penalize_near_tie: bool,
) -> KeyEstimate {
    let decision = decide_mode(scores);
    let mut confidence = ratio_confidence(decision.winning, decision.competing);

    if penalize_near_tie && (decision.winning - decision.competing).abs() < config.near_tie_margin {
        log::debug!(
            "Near tie between modes ({:.4} vs {:.4}), confidence x{:.2}",
            decision.winning,
            decision.competing,
            config.near_tie_penalty
        );
        confidence *= config.near_tie_penalty;
    }

    KeyEstimate {
        key: decision.key,
        confidence,
    }
}

/// Single-pass key estimate over the whole waveform
///
/// # Arguments
///
/// * `samples` - Mono audio samples (already trimmed)
/// * `sample_rate` - Sample rate in Hz
/// * `store` - Validated template store
/// * `config` - Analysis configuration
///
/// # Returns
///
/// The estimate and the 24 key scores, which are reused to rank alternatives
///
/// # Errors
///
/// Returns `AnalysisError` if pitch-class extraction fails (empty input, invalid sizes)
pub fn estimate_single_pass(
    samples: &[f32],
    sample_rate: u32,
    store: &ProfileStore,
    config: &AnalysisConfig,
) -> Result<(KeyEstimate, KeyScores), AnalysisError> {
    let pcv = extract_pitch_class_vector(samples, sample_rate, config)?;
    let scores = correlate(&pcv, store);
    let estimate = estimate_from_scores(&scores, config, true);

    log::debug!(
        "Single-pass estimate: {} (confidence {:.3})",
        estimate.key.name(),
        estimate.confidence
    );

    Ok((estimate, scores))
}

/// Sample ranges of the voting segments
///
/// Consecutive segments of `segment_len` samples; the trailing segment is kept
/// only if it has at least `min_len` samples.
pub fn segment_bounds(len: usize, segment_len: usize, min_len: usize) -> Vec<(usize, usize)> {
    if segment_len == 0 {
        return Vec::new();
    }

    (0..len)
        .step_by(segment_len)
        .map(|start| (start, (start + segment_len).min(len)))
        .filter(|(start, end)| end - start >= min_len.max(1))
        .collect()
}

/// Combine per-segment votes into one estimate
///
/// The tonic tally accumulates each vote's confidence at its tonic regardless
/// of mode; the mode tally accumulates it at its mode. The tonic is the tally
/// maximum (lowest index on ties), the mode the larger mass (major on ties),
/// and the confidence the mean segment confidence.
pub fn aggregate_segment_votes(votes: &[KeyEstimate]) -> KeyEstimate {
    if votes.is_empty() {
        return KeyEstimate::degenerate();
    }

    let mut tonic_tally = [0.0f32; 12];
    let mut major_mass = 0.0f32;
    let mut minor_mass = 0.0f32;
    for vote in votes {
        tonic_tally[vote.key.tonic() as usize] += vote.confidence;
        match vote.key {
            Key::Major(_) => major_mass += vote.confidence,
            Key::Minor(_) => minor_mass += vote.confidence,
        }
    }

    let mut tonic = 0;
    for (i, &mass) in tonic_tally.iter().enumerate().skip(1) {
        if mass > tonic_tally[tonic] {
            tonic = i;
        }
    }

    let key = if major_mass >= minor_mass {
        Key::Major(tonic as u32)
    } else {
        Key::Minor(tonic as u32)
    };
    let confidence = votes.iter().map(|v| v.confidence).sum::<f32>() / votes.len() as f32;

    KeyEstimate { key, confidence }
}

/// Segment-voted key estimate
///
/// Each segment runs the single-pass logic without the near-tie penalty and
/// casts one vote. A waveform with no usable segment yields the degenerate
/// estimate (C major, confidence 0.0).
///
/// # Errors
///
/// Returns `AnalysisError` if pitch-class extraction fails for a segment
pub fn estimate_segment_voting(
    samples: &[f32],
    sample_rate: u32,
    store: &ProfileStore,
    config: &AnalysisConfig,
) -> Result<KeyEstimate, AnalysisError> {
    let bounds = segment_bounds(
        samples.len(),
        config.segment_samples(sample_rate),
        (config.min_segment_secs * sample_rate as f32) as usize,
    );

    if bounds.is_empty() {
        log::warn!(
            "No usable segments in {:.2}s of audio, segment vote is degenerate",
            samples.len() as f32 / sample_rate.max(1) as f32
        );
        return Ok(KeyEstimate::degenerate());
    }

    let mut votes = Vec::with_capacity(bounds.len());
    for (start, end) in bounds {
        let pcv = extract_pitch_class_vector(&samples[start..end], sample_rate, config)?;
        let scores = correlate(&pcv, store);
        votes.push(estimate_from_scores(&scores, config, false));
    }

    let estimate = aggregate_segment_votes(&votes);
    log::debug!(
        "Segment-voting estimate from {} segments: {} (confidence {:.3})",
        votes.len(),
        estimate.key.name(),
        estimate.confidence
    );

    Ok(estimate)
}
