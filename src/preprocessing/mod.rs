//! Audio preprocessing modules
//!
//! Utilities that prepare a waveform for feature extraction:
//! - Channel mixing (multichannel to mono)
//! - Analysis window selection (edge trimming, span cap)
//! - Shared STFT / inverse STFT
//! - Harmonic-percussive separation

pub mod channel_mixer;
pub mod hpss;
pub mod stft;
pub mod window;
