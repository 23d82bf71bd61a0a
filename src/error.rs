//! Error types for the key detection engine

use std::fmt;

/// Errors that can occur during key analysis
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// Invalid input parameters
    InvalidInput(String),

    /// Audio could not be loaded or decoded
    DecodingError(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Malformed reference templates or analysis configuration.
    ///
    /// This is a programming/configuration defect, reported once when the
    /// detector is built rather than per track.
    ConfigurationError(String),

    /// Result cache or checksum I/O failure
    CacheError(String),
}

impl AnalysisError {
    /// True for errors that must abort the process instead of a single track.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::ConfigurationError(_))
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::DecodingError(msg) => write!(f, "Decoding error: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AnalysisError::CacheError(msg) => write!(f, "Cache error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}
