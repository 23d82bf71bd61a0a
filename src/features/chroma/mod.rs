//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from audio:
//! - Constant-Q style chroma (long FFT, semitone filterbank)
//! - STFT chroma with soft pitch-class mapping
//! - CENS (quantized, smoothed chroma)
//! - Normalization strategies
//! - Temporal smoothing and median aggregation

pub mod cens;
pub mod cqt;
pub mod extractor;
pub mod normalization;
pub mod smoothing;

pub use extractor::extract_pitch_class_vector;
