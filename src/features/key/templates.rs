//! Reference tonal templates
//!
//! Each template holds the expected pitch-class salience of a major and a minor key
//! with tonic C, plus the weight it carries when correlations of several templates
//! are blended.
//!
//! # References
//!
//! - Krumhansl, C. L., & Kessler, E. J. (1982). Tracing the Dynamic Changes in Perceived
//!   Tonal Organization in a Spatial Representation of Musical Keys. *Psychological Review*.
//! - Temperley, D. (1999). What's Key for Key? The Krumhansl-Schmuckler Key-Finding
//!   Algorithm Reconsidered. *Music Perception*.
//! - Albrecht, J., & Shanahan, D. (2013). The Use of Large Corpora to Train a New Type of
//!   Key-Finding Algorithm. *Music Perception*.

use crate::error::AnalysisError;

/// Tolerance on the sum of template weights
const WEIGHT_SUM_TOLERANCE: f32 = 1e-4;

/// Krumhansl-Kessler probe-tone ratings, C major
pub const KRUMHANSL_KESSLER_MAJOR: [f32; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler probe-tone ratings, C minor
pub const KRUMHANSL_KESSLER_MINOR: [f32; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Temperley (Kostka-Payne corpus), C major
pub const TEMPERLEY_MAJOR: [f32; 12] = [
    5.0, 2.0, 3.5, 2.0, 4.5, 4.0, 2.0, 4.5, 2.0, 3.5, 1.5, 4.0,
];

/// Temperley (Kostka-Payne corpus), C minor
pub const TEMPERLEY_MINOR: [f32; 12] = [
    5.0, 2.0, 3.5, 4.5, 2.0, 4.0, 2.0, 4.5, 3.5, 2.0, 1.5, 4.0,
];

/// Albrecht-Shanahan pitch-class distribution, C major
pub const ALBRECHT_SHANAHAN_MAJOR: [f32; 12] = [
    0.238, 0.006, 0.111, 0.006, 0.137, 0.094, 0.016, 0.214, 0.009, 0.080, 0.008, 0.081,
];

/// Albrecht-Shanahan pitch-class distribution, C minor
pub const ALBRECHT_SHANAHAN_MINOR: [f32; 12] = [
    0.220, 0.006, 0.104, 0.123, 0.019, 0.103, 0.012, 0.214, 0.062, 0.022, 0.061, 0.052,
];

/// A named major/minor template pair with its blend weight
#[derive(Debug, Clone, PartialEq)]
pub struct ToneTemplate {
    /// Template name, used in log output and error messages
    pub name: String,

    /// Major profile with tonic at index 0
    pub major: [f32; 12],

    /// Minor profile with tonic at index 0
    pub minor: [f32; 12],

    /// Blend weight in [0, 1]
    pub weight: f32,
}

impl ToneTemplate {
    /// Create a template
    pub fn new(name: impl Into<String>, major: [f32; 12], minor: [f32; 12], weight: f32) -> Self {
        Self {
            name: name.into(),
            major,
            minor,
            weight,
        }
    }

    /// Major profile rotated so its tonic lands on `tonic`
    pub fn rotated_major(&self, tonic: usize) -> [f32; 12] {
        rotate(&self.major, tonic)
    }

    /// Minor profile rotated so its tonic lands on `tonic`
    pub fn rotated_minor(&self, tonic: usize) -> [f32; 12] {
        rotate(&self.minor, tonic)
    }
}

/// Rotate a C-based profile so that index `tonic` holds the tonic value
///
/// `rotated[j] = profile[(j + 12 - tonic) % 12]`
pub fn rotate(profile: &[f32; 12], tonic: usize) -> [f32; 12] {
    let tonic = tonic % 12;
    let mut out = [0.0f32; 12];
    for (j, v) in out.iter_mut().enumerate() {
        *v = profile[(j + 12 - tonic) % 12];
    }
    out
}

/// Validated set of tone templates
///
/// Validation happens once, when the store is built. A store that exists is
/// always well formed.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    templates: Vec<ToneTemplate>,
}

impl ProfileStore {
    /// Built-in store: Krumhansl-Kessler (0.4), Temperley (0.3), Albrecht-Shanahan (0.3)
    ///
    /// # Errors
    ///
    /// Never fails for the built-in values; the `Result` keeps the signature
    /// aligned with [`ProfileStore::from_templates`].
    pub fn standard() -> Result<Self, AnalysisError> {
        Self::from_templates(vec![
            ToneTemplate::new(
                "krumhansl-kessler",
                KRUMHANSL_KESSLER_MAJOR,
                KRUMHANSL_KESSLER_MINOR,
                0.4,
            ),
            ToneTemplate::new("temperley", TEMPERLEY_MAJOR, TEMPERLEY_MINOR, 0.3),
            ToneTemplate::new(
                "albrecht-shanahan",
                ALBRECHT_SHANAHAN_MAJOR,
                ALBRECHT_SHANAHAN_MINOR,
                0.3,
            ),
        ])
    }

    /// Single-template store: Krumhansl-Kessler with weight 1.0
    pub fn krumhansl_kessler() -> Result<Self, AnalysisError> {
        Self::from_templates(vec![ToneTemplate::new(
            "krumhansl-kessler",
            KRUMHANSL_KESSLER_MAJOR,
            KRUMHANSL_KESSLER_MINOR,
            1.0,
        )])
    }

    /// Build a store from custom templates
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if:
    /// - no template is given
    /// - a profile value is negative or not finite
    /// - a weight is outside [0, 1], or the weights do not sum to 1.0
    /// - a major or minor profile is constant (its correlation is undefined)
    pub fn from_templates(templates: Vec<ToneTemplate>) -> Result<Self, AnalysisError> {
        if templates.is_empty() {
            return Err(AnalysisError::ConfigurationError(
                "at least one tone template is required".to_string(),
            ));
        }

        for t in &templates {
            for (label, profile) in [("major", &t.major), ("minor", &t.minor)] {
                if let Some(bad) = profile.iter().find(|v| !v.is_finite() || **v < 0.0) {
                    return Err(AnalysisError::ConfigurationError(format!(
                        "template '{}' has invalid {} value {}",
                        t.name, label, bad
                    )));
                }
                let first = profile[0];
                if profile.iter().all(|&v| (v - first).abs() < f32::EPSILON) {
                    return Err(AnalysisError::ConfigurationError(format!(
                        "template '{}' has a constant {} profile",
                        t.name, label
                    )));
                }
            }

            if !t.weight.is_finite() || !(0.0..=1.0).contains(&t.weight) {
                return Err(AnalysisError::ConfigurationError(format!(
                    "template '{}' weight {} is outside [0, 1]",
                    t.name, t.weight
                )));
            }
        }

        let sum: f32 = templates.iter().map(|t| t.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AnalysisError::ConfigurationError(format!(
                "template weights must sum to 1.0, got {:.5}",
                sum
            )));
        }

        log::debug!(
            "Profile store ready: {}",
            templates
                .iter()
                .map(|t| format!("{}={:.2}", t.name, t.weight))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self { templates })
    }

    /// Templates in this store
    pub fn templates(&self) -> &[ToneTemplate] {
        &self.templates
    }
}
