//! Configuration parameters for key analysis

use crate::error::AnalysisError;

/// Relative weights of the three chroma estimates blended into one pitch-class profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaWeights {
    /// Constant-Q style chroma (fine pitch resolution)
    pub constant_q: f32,
    /// Short-time Fourier chroma
    pub stft: f32,
    /// Energy-normalized, smoothed chroma (CENS)
    pub cens: f32,
}

impl Default for ChromaWeights {
    fn default() -> Self {
        Self {
            constant_q: 0.5,
            stft: 0.3,
            cens: 0.2,
        }
    }
}

/// Analysis configuration parameters
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    // Input
    /// Sample rate the loader resamples to (default: 22050)
    pub sample_rate: u32,

    // STFT parameters
    /// Frame size for STFT (default: 2048)
    pub frame_size: usize,

    /// Hop size for STFT (default: 512)
    pub hop_size: usize,

    // Harmonic-percussive separation
    /// Median filter length in frames/bins (default: 31)
    pub hpss_kernel_size: usize,

    /// Harmonic mask margin (default: 1.0)
    /// Values <= 1.0 keep more energy in the harmonic component
    pub hpss_margin: f32,

    // Chroma
    /// FFT size for the constant-Q style chroma (default: 8192)
    pub constant_q_fft_size: usize,

    /// Lowest MIDI note of the constant-Q bank (default: 36, C2)
    pub constant_q_min_midi: u8,

    /// Number of octaves covered by the constant-Q bank (default: 6)
    pub constant_q_octaves: u8,

    /// Gaussian width of each constant-Q band in semitones (default: 0.35)
    pub constant_q_sigma: f32,

    /// Soft mapping standard deviation in semitones for STFT chroma (default: 0.5)
    /// Lower values = sharper mapping, higher values = more spread
    pub soft_mapping_sigma: f32,

    /// Lowest frequency mapped by the STFT chroma in Hz (default: 55.0)
    pub chroma_min_frequency: f32,

    /// CENS temporal smoothing window in frames (default: 41)
    pub cens_smoothing_window: usize,

    /// Blend weights of the three chroma estimates (default: 0.5 / 0.3 / 0.2)
    pub chroma_weights: ChromaWeights,

    // Key estimation
    /// Segment length for segment voting in seconds (default: 10.0)
    pub segment_duration_secs: f32,

    /// Trailing segments shorter than this are dropped (default: 1.0)
    pub min_segment_secs: f32,

    /// Major/minor score gap below which a pass counts as a near tie (default: 0.05)
    pub near_tie_margin: f32,

    /// Confidence multiplier for near ties (default: 0.8)
    pub near_tie_penalty: f32,

    /// Confidence ratio at which one estimator overrides the other (default: 1.2)
    pub dominance_ratio: f32,

    /// Confidence multiplier when both estimators agree (default: 1.1)
    /// Not capped: agreeing results may report confidence slightly above 1.0
    pub agreement_bonus: f32,

    /// Confidence multiplier when estimators disagree with similar confidence (default: 0.9)
    pub disagreement_penalty: f32,

    /// Mean RMS below which a track counts as quiet (default: 0.01)
    pub quiet_energy_threshold: f32,

    /// Confidence multiplier for quiet tracks (default: 0.7)
    pub quiet_penalty: f32,

    /// Number of alternative keys reported (default: 3)
    pub alternative_count: usize,

    // Tempo
    /// Minimum BPM to consider (default: 60.0)
    pub min_bpm: f32,

    /// Maximum BPM to consider (default: 180.0)
    pub max_bpm: f32,

    /// Onset threshold relative to the strongest energy flux, in dB (default: -20.0)
    pub onset_threshold_db: f32,

    // Analysis window
    /// Edge trimmed from both ends of long tracks, in seconds (default: 10.0)
    pub edge_trim_secs: f32,

    /// Tracks longer than this get their edges trimmed, in seconds (default: 30.0)
    pub edge_trim_min_duration_secs: f32,

    /// Longest span analyzed per track, in seconds (default: 120.0)
    pub max_analysis_secs: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            frame_size: 2048,
            hop_size: 512,
            hpss_kernel_size: 31,
            hpss_margin: 1.0,
            constant_q_fft_size: 8192,
            constant_q_min_midi: 36,
            constant_q_octaves: 6,
            constant_q_sigma: 0.35,
            soft_mapping_sigma: 0.5,
            chroma_min_frequency: 55.0,
            cens_smoothing_window: 41,
            chroma_weights: ChromaWeights::default(),
            segment_duration_secs: 10.0,
            min_segment_secs: 1.0,
            near_tie_margin: 0.05,
            near_tie_penalty: 0.8,
            dominance_ratio: 1.2,
            agreement_bonus: 1.1,
            disagreement_penalty: 0.9,
            quiet_energy_threshold: 0.01,
            quiet_penalty: 0.7,
            alternative_count: 3,
            min_bpm: 60.0,
            max_bpm: 180.0,
            onset_threshold_db: -20.0,
            edge_trim_secs: 10.0,
            edge_trim_min_duration_secs: 30.0,
            max_analysis_secs: 120.0,
        }
    }
}

impl AnalysisConfig {
    /// Check structural invariants of the configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if a size is zero, the chroma
    /// weights are negative or do not sum to 1.0, or a range is inverted.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::ConfigurationError(
                "sample_rate must be > 0".to_string(),
            ));
        }

        if self.frame_size == 0 || self.hop_size == 0 || self.constant_q_fft_size == 0 {
            return Err(AnalysisError::ConfigurationError(format!(
                "frame sizes must be > 0 (frame={}, hop={}, constant_q_fft={})",
                self.frame_size, self.hop_size, self.constant_q_fft_size
            )));
        }

        // Overlap-add resynthesis needs at least 50% overlap.
        if self.hop_size > self.frame_size / 2 {
            return Err(AnalysisError::ConfigurationError(format!(
                "hop_size ({}) must not exceed half the frame size ({})",
                self.hop_size, self.frame_size
            )));
        }

        if self.hpss_kernel_size == 0 {
            return Err(AnalysisError::ConfigurationError(
                "hpss_kernel_size must be > 0".to_string(),
            ));
        }

        if self.constant_q_octaves == 0 {
            return Err(AnalysisError::ConfigurationError(
                "constant_q_octaves must be > 0".to_string(),
            ));
        }

        let w = self.chroma_weights;
        if w.constant_q < 0.0 || w.stft < 0.0 || w.cens < 0.0 {
            return Err(AnalysisError::ConfigurationError(format!(
                "chroma weights must be non-negative: {:?}",
                w
            )));
        }
        let sum = w.constant_q + w.stft + w.cens;
        if (sum - 1.0).abs() > 1e-4 {
            return Err(AnalysisError::ConfigurationError(format!(
                "chroma weights must sum to 1.0, got {:.4}",
                sum
            )));
        }

        if self.segment_duration_secs <= 0.0 || self.min_segment_secs < 0.0 {
            return Err(AnalysisError::ConfigurationError(format!(
                "invalid segment lengths: segment={:.2}s, minimum={:.2}s",
                self.segment_duration_secs, self.min_segment_secs
            )));
        }

        if self.min_bpm <= 0.0 || self.min_bpm >= self.max_bpm {
            return Err(AnalysisError::ConfigurationError(format!(
                "invalid BPM range: [{:.1}, {:.1}]",
                self.min_bpm, self.max_bpm
            )));
        }

        if self.max_analysis_secs <= 0.0 {
            return Err(AnalysisError::ConfigurationError(
                "max_analysis_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Segment length in samples at the given sample rate
    pub fn segment_samples(&self, sample_rate: u32) -> usize {
        (self.segment_duration_secs * sample_rate as f32) as usize
    }
}
