//! # Tonic DSP
//!
//! Musical key detection for recorded tracks: tonic and mode with a
//! confidence score, runner-up keys, and a few auxiliary descriptors
//! (tempo, energy, brightness).
//!
//! ## Features
//!
//! - **Pitch-class extraction**: harmonic separation, then a blend of
//!   constant-Q, STFT and CENS chroma summarized by a per-bin median
//! - **Key detection**: weighted Pearson correlation against Krumhansl-Kessler,
//!   Temperley and Albrecht-Shanahan profiles for all 24 keys
//! - **Consensus**: a whole-track estimate and a segment vote reconciled into
//!   one key and confidence
//! - **Batch analysis**: decoding, content-addressed caching, optional
//!   parallelism and key transitions across a playlist
//!
//! ## Quick Start
//!
//! ```no_run
//! use tonic_dsp::{detect_key, AnalysisConfig};
//!
//! // Load audio samples (mono, f32, normalized)
//! let samples: Vec<f32> = vec![]; // Your audio data
//! let sample_rate = 22050;
//!
//! let result = detect_key(&samples, sample_rate, AnalysisConfig::default())?;
//!
//! println!("Key: {} (confidence: {:.3})", result.label(), result.confidence);
//! println!("Tempo: {:.1} BPM", result.tempo);
//! # Ok::<(), tonic_dsp::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Audio Input → Preprocessing → Chroma → Key Estimation → Consensus → Output
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;

// Re-export main types
pub use analysis::batch::{compute_transitions, BatchAnalyzer, BatchOptions};
pub use analysis::result::{
    AlternativeKey, AnalysisResult, CacheEntry, Key, KeyTransition, Mode, TrackRow,
};
pub use config::{AnalysisConfig, ChromaWeights};
pub use error::AnalysisError;
pub use features::key::{KeyEstimate, ProfileStore, ToneTemplate};
pub use io::{
    AudioLoader, Blake3Hasher, ContentHasher, DirectoryCache, MemoryCache, ResultCache,
    SymphoniaLoader,
};

use analysis::consensus::build_result;
use features::descriptors::compute_descriptors;
use features::key::{estimate_segment_voting, estimate_single_pass};

/// Key detection engine
///
/// Holds a validated configuration and the reference profiles. It is
/// read-only during analysis and can be shared between threads.
#[derive(Debug, Clone)]
pub struct KeyDetector {
    config: AnalysisConfig,
    profiles: ProfileStore,
}

impl KeyDetector {
    /// Detector with the standard three-template profile store
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if `config` is invalid
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        Self::with_profiles(config, ProfileStore::standard()?)
    }

    /// Detector with a custom profile store
    ///
    /// [`ProfileStore::krumhansl_kessler`] gives the single-template variant.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if `config` is invalid
    pub fn with_profiles(config: AnalysisConfig, profiles: ProfileStore) -> Result<Self, AnalysisError> {
        config.validate()?;
        log::debug!(
            "Key detector ready: {} templates, {} Hz analysis rate",
            profiles.templates().len(),
            config.sample_rate
        );
        Ok(Self { config, profiles })
    }

    /// Analysis configuration
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Reference profiles
    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Detect the key of a decoded, trimmed mono waveform
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    ///
    /// `AnalysisResult` with key, confidence, alternatives and descriptors
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an empty waveform, a zero
    /// sample rate or a NaN/infinite sample, or an error from the processing
    /// pipeline
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tonic_dsp::{AnalysisConfig, KeyDetector};
    ///
    /// let detector = KeyDetector::new(AnalysisConfig::default())?;
    /// let samples = vec![0.0f32; 22050 * 30]; // 30 seconds of silence
    /// let result = detector.detect(&samples, 22050)?;
    /// # Ok::<(), tonic_dsp::AnalysisError>(())
    /// ```
    pub fn detect(&self, samples: &[f32], sample_rate: u32) -> Result<AnalysisResult, AnalysisError> {
        use std::time::Instant;
        let start_time = Instant::now();

        log::debug!(
            "Starting key detection: {} samples at {} Hz",
            samples.len(),
            sample_rate
        );

        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
        }

        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
        }

        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!(
                "Non-finite sample at index {}",
                pos
            )));
        }

        let (single, scores) = estimate_single_pass(samples, sample_rate, &self.profiles, &self.config)?;
        let segment = estimate_segment_voting(samples, sample_rate, &self.profiles, &self.config)?;
        let descriptors = compute_descriptors(samples, sample_rate, &self.config);

        let result = build_result(single, segment, &scores, &descriptors, &self.config);

        log::debug!(
            "Detected {} (confidence {:.3}) in {:.1}ms",
            result.label(),
            result.confidence,
            start_time.elapsed().as_secs_f32() * 1000.0
        );

        Ok(result)
    }
}

/// Detect the key of a waveform with a one-off detector
///
/// # Errors
///
/// Returns `AnalysisError::ConfigurationError` for an invalid `config`, or any
/// error of [`KeyDetector::detect`]
///
/// # Example
///
/// ```no_run
/// use tonic_dsp::{detect_key, AnalysisConfig};
///
/// let samples = vec![0.0f32; 22050 * 30];
/// let result = detect_key(&samples, 22050, AnalysisConfig::default())?;
/// # Ok::<(), tonic_dsp::AnalysisError>(())
/// ```
pub fn detect_key(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    KeyDetector::new(config)?.detect(samples, sample_rate)
}
