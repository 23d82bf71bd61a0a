//! Feature extraction modules
//!
//! This module contains all feature extraction algorithms:
//! - Chroma extraction (constant-Q, STFT and CENS, blended)
//! - Key detection (template correlation, segment voting)
//! - Onset detection and period estimation (tempo)
//! - Track descriptors (tempo, energy, brightness)

pub mod chroma;
pub mod descriptors;
pub mod key;
pub mod onset;
pub mod period;
