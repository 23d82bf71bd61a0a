//! Key detection modules
//!
//! Detect musical key using:
//! - Three reference templates (Krumhansl-Kessler, Temperley, Albrecht-Shanahan)
//! - Weighted Pearson correlation against all 24 keys
//! - Whole-track and segment-voted estimation

pub mod correlator;
pub mod detector;
pub mod templates;

pub use correlator::{correlate, KeyScores};
pub use detector::{estimate_segment_voting, estimate_single_pass};
pub use templates::{ProfileStore, ToneTemplate};

use crate::analysis::result::Key;

/// Key estimate of one estimation strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEstimate {
    /// Detected key
    pub key: Key,

    /// Confidence score (normally 0.0-1.0)
    pub confidence: f32,
}

impl KeyEstimate {
    /// Estimate returned when nothing could be measured: C major, confidence 0.0
    pub fn degenerate() -> Self {
        Self {
            key: Key::Major(0),
            confidence: 0.0,
        }
    }
}
