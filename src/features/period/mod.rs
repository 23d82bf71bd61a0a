//! Period estimation modules
//!
//! Convert onset list to BPM candidates using:
//! - Autocorrelation with a tempo prior

pub mod autocorrelation;

/// BPM candidate with confidence
#[derive(Debug, Clone, PartialEq)]
pub struct BpmCandidate {
    /// BPM estimate
    pub bpm: f32,

    /// Confidence relative to the strongest candidate (0.0-1.0)
    pub confidence: f32,
}
