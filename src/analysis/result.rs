//! Analysis result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pitch-class names, index 0 = C
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Tonic label used by the sentinel result
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Mode of a detected key
///
/// `Unknown` only appears in the sentinel result of a track that could not be analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Major mode
    Major,
    /// Minor mode
    Minor,
    /// No key could be detected
    Unknown,
}

impl Mode {
    /// Lowercase name ("major", "minor", "unknown")
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
            Mode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Build a key from a tonic index and mode; `None` for `Mode::Unknown`
    pub fn from_parts(tonic: u32, mode: Mode) -> Option<Self> {
        match mode {
            Mode::Major => Some(Key::Major(tonic % 12)),
            Mode::Minor => Some(Key::Minor(tonic % 12)),
            Mode::Unknown => None,
        }
    }

    /// Tonic pitch class (0 = C, ..., 11 = B)
    pub fn tonic(&self) -> u32 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }

    /// Mode of this key
    pub fn mode(&self) -> Mode {
        match self {
            Key::Major(_) => Mode::Major,
            Key::Minor(_) => Mode::Minor,
        }
    }

    /// Tonic note name without mode suffix (e.g., "F#")
    pub fn tonic_name(&self) -> &'static str {
        NOTE_NAMES[self.tonic() as usize]
    }

    /// Get key name in musical notation (e.g., "C", "Am", "F#", "D#m")
    ///
    /// Returns standard musical notation:
    /// - Major keys: note name only (e.g., "C", "C#", "D", "F#")
    /// - Minor keys: note name + "m" (e.g., "Am", "C#m", "Dm", "F#m")
    ///
    /// # Example
    ///
    /// ```
    /// use tonic_dsp::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).name(), "C");
    /// assert_eq!(Key::Major(6).name(), "F#");
    /// assert_eq!(Key::Minor(9).name(), "Am");
    /// assert_eq!(Key::Minor(1).name(), "C#m");
    /// ```
    pub fn name(&self) -> String {
        match self {
            Key::Major(_) => self.tonic_name().to_string(),
            Key::Minor(_) => format!("{}m", self.tonic_name()),
        }
    }

    /// Relative key: a minor key's relative major sits 3 semitones up,
    /// a major key's relative minor 3 semitones down
    ///
    /// # Example
    ///
    /// ```
    /// use tonic_dsp::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).relative(), Key::Minor(9)); // C -> Am
    /// assert_eq!(Key::Minor(9).relative(), Key::Major(0)); // Am -> C
    /// ```
    pub fn relative(&self) -> Key {
        match self {
            Key::Major(_) => Key::Minor((self.tonic() + 9) % 12),
            Key::Minor(_) => Key::Major((self.tonic() + 3) % 12),
        }
    }

    /// Relative key spelled out with its mode (e.g., "A minor")
    pub fn relative_label(&self) -> String {
        let rel = self.relative();
        format!("{} {}", rel.tonic_name(), rel.mode())
    }

    /// Scale label pairing this key with the tonic of its relative key
    /// (e.g., "C/A", "Am/C")
    pub fn scale_label(&self) -> String {
        format!("{}/{}", self.name(), self.relative().tonic_name())
    }

    /// Get key in DJ standard numerical notation (e.g., "1A", "2B", "12A")
    ///
    /// Uses the circle of fifths mapping popularized in DJ software:
    /// - Major keys: 1A-12A (1A = C, 2A = G, 3A = D, ..., 12A = F)
    /// - Minor keys: 1B-12B (1B = Am, 2B = Em, 3B = Bm, ..., 12B = Dm)
    ///
    /// # Example
    ///
    /// ```
    /// use tonic_dsp::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).numerical(), "1A");   // C
    /// assert_eq!(Key::Major(7).numerical(), "2A");   // G
    /// assert_eq!(Key::Minor(9).numerical(), "1B");   // Am
    /// assert_eq!(Key::Minor(4).numerical(), "2B");   // Em
    /// ```
    pub fn numerical(&self) -> String {
        let (circle, suffix) = match self {
            Key::Major(_) => (&CIRCLE_OF_FIFTHS_MAJOR, 'A'),
            Key::Minor(_) => (&CIRCLE_OF_FIFTHS_MINOR, 'B'),
        };
        let position = circle
            .iter()
            .position(|&x| x == self.tonic())
            .unwrap_or(0);
        format!("{}{}", position + 1, suffix)
    }

    /// Get key from DJ standard numerical notation
    ///
    /// # Arguments
    ///
    /// * `notation` - Numerical key notation (e.g., "1A", "2B", "12A")
    ///
    /// # Returns
    ///
    /// `Some(Key)` if valid, `None` if invalid format
    ///
    /// # Example
    ///
    /// ```
    /// use tonic_dsp::analysis::result::Key;
    ///
    /// assert_eq!(Key::from_numerical("1A"), Some(Key::Major(0)));   // C
    /// assert_eq!(Key::from_numerical("1B"), Some(Key::Minor(9)));   // Am
    /// assert_eq!(Key::from_numerical("13A"), None);
    /// ```
    pub fn from_numerical(notation: &str) -> Option<Self> {
        if notation.len() < 2 || !notation.is_ascii() {
            return None;
        }

        let (num_str, suffix) = notation.split_at(notation.len() - 1);
        let num: usize = num_str.parse().ok()?;

        if !(1..=12).contains(&num) {
            return None;
        }

        match suffix {
            "A" => Some(Key::Major(CIRCLE_OF_FIFTHS_MAJOR[num - 1])),
            "B" => Some(Key::Minor(CIRCLE_OF_FIFTHS_MINOR[num - 1])),
            _ => None,
        }
    }
}

// C, G, D, A, E, B, F#, C#, G#, D#, A#, F
const CIRCLE_OF_FIFTHS_MAJOR: [u32; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];
// Am, Em, Bm, F#m, C#m, G#m, D#m, A#m, Fm, Cm, Gm, Dm
const CIRCLE_OF_FIFTHS_MINOR: [u32; 12] = [9, 4, 11, 6, 1, 8, 3, 10, 5, 0, 7, 2];

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Runner-up key candidate reported next to the detected key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeKey {
    /// Key label in musical notation (e.g., "F#m")
    pub label: String,

    /// Candidate score relative to the detected key's score (3 decimals)
    pub relative_confidence: f32,
}

/// Complete analysis result for one track
///
/// Every field is always present. Tracks that cannot be analyzed carry the
/// sentinel values of [`AnalysisResult::unknown`] instead of missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Tonic name ("C", "F#", ...) or "Unknown"
    pub key: String,

    /// Detected mode
    pub mode: Mode,

    /// Key confidence (3 decimals)
    ///
    /// Usually in [0, 1]; agreement between the whole-track and segment-voted
    /// estimates may push it slightly above 1.0.
    pub confidence: f32,

    /// Scale label ("C/A", "Am/C") or "Unknown"
    pub scale: String,

    /// Relative key ("A minor", "C major") or "Unknown"
    pub relative_key: String,

    /// Tempo in BPM (1 decimal, 0.0 when no tempo was found)
    pub tempo: f32,

    /// Mean frame RMS (3 decimals)
    pub energy: f32,

    /// Mean spectral centroid in Hz (1 decimal)
    pub brightness: f32,

    /// Up to three runner-up keys, best first
    pub alternatives: Vec<AlternativeKey>,
}

impl AnalysisResult {
    /// Sentinel result for a track that could not be analyzed
    pub fn unknown() -> Self {
        Self {
            key: UNKNOWN_LABEL.to_string(),
            mode: Mode::Unknown,
            confidence: 0.0,
            scale: UNKNOWN_LABEL.to_string(),
            relative_key: UNKNOWN_LABEL.to_string(),
            tempo: 0.0,
            energy: 0.0,
            brightness: 0.0,
            alternatives: Vec::new(),
        }
    }

    /// True for the sentinel result
    pub fn is_unknown(&self) -> bool {
        self.mode == Mode::Unknown
    }

    /// Tonic pitch class of the detected key, `None` for unrecognized names
    pub fn tonic_index(&self) -> Option<u32> {
        NOTE_NAMES
            .iter()
            .position(|&n| n == self.key)
            .map(|i| i as u32)
    }

    /// Detected key, `None` for the sentinel
    pub fn detected_key(&self) -> Option<Key> {
        Key::from_parts(self.tonic_index()?, self.mode)
    }

    /// Key and mode spelled out ("C major", "Unknown unknown")
    pub fn label(&self) -> String {
        format!("{} {}", self.key, self.mode)
    }
}

/// One row of a batch result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    /// Source file name
    pub file: String,

    /// Artist, supplied by the caller's metadata function
    pub artist: String,

    /// Track title, supplied by the caller's metadata function
    pub track: String,

    /// Analysis result (sentinel if the track failed)
    #[serde(flatten)]
    pub result: AnalysisResult,
}

/// Key movement between two adjacent rows of a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTransition {
    /// 1-based index of the first row of the pair
    pub position: usize,

    /// Label of the first row ("C major")
    pub from: String,

    /// Label of the second row ("G major")
    pub to: String,

    /// Circular semitone distance between the two tonics (0-6, mode ignored)
    pub distance: u32,
}

/// Persisted cache record: flattened result plus the metadata it was stored with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Artist at the time of analysis
    pub artist: String,

    /// Track title at the time of analysis
    pub track: String,

    /// Cached analysis result
    #[serde(flatten)]
    pub result: AnalysisResult,
}

/// Round to a fixed number of decimals
pub(crate) fn round_to(value: f32, decimals: i32) -> f32 {
    let factor = 10f32.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_major() {
        assert_eq!(Key::Major(0).name(), "C");
        assert_eq!(Key::Major(1).name(), "C#");
        assert_eq!(Key::Major(6).name(), "F#");
        assert_eq!(Key::Major(11).name(), "B");
    }

    #[test]
    fn test_key_name_minor() {
        assert_eq!(Key::Minor(0).name(), "Cm");
        assert_eq!(Key::Minor(9).name(), "Am");
        assert_eq!(Key::Minor(11).name(), "Bm");
    }

    #[test]
    fn test_relative_key_round_trip() {
        for i in 0..12 {
            let major = Key::Major(i);
            let minor = Key::Minor(i);
            assert_eq!(major.relative().relative(), major, "round trip failed for {}", major);
            assert_eq!(minor.relative().relative(), minor, "round trip failed for {}", minor);
            assert_eq!(major.relative().tonic(), (i + 9) % 12);
            assert_eq!(minor.relative().tonic(), (i + 3) % 12);
        }
    }

    #[test]
    fn test_relative_and_scale_labels() {
        assert_eq!(Key::Major(0).relative_label(), "A minor");
        assert_eq!(Key::Minor(9).relative_label(), "C major");
        assert_eq!(Key::Major(0).scale_label(), "C/A");
        assert_eq!(Key::Minor(9).scale_label(), "Am/C");
        assert_eq!(Key::Minor(6).scale_label(), "F#m/A");
        assert_eq!(Key::Major(3).relative_label(), "C minor");
    }

    #[test]
    fn test_key_numerical() {
        assert_eq!(Key::Major(0).numerical(), "1A");
        assert_eq!(Key::Major(7).numerical(), "2A");
        assert_eq!(Key::Major(5).numerical(), "12A");
        assert_eq!(Key::Minor(9).numerical(), "1B");
        assert_eq!(Key::Minor(2).numerical(), "12B");
    }

    #[test]
    fn test_key_from_numerical() {
        assert_eq!(Key::from_numerical("7A"), Some(Key::Major(6)));
        assert_eq!(Key::from_numerical("10B"), Some(Key::Minor(0)));
        assert_eq!(Key::from_numerical("0A"), None);
        assert_eq!(Key::from_numerical("13A"), None);
        assert_eq!(Key::from_numerical("1C"), None);
        assert_eq!(Key::from_numerical(""), None);
        assert_eq!(Key::from_numerical("A"), None);
    }

    #[test]
    fn test_key_numerical_roundtrip() {
        for i in 0..12 {
            for key in [Key::Major(i), Key::Minor(i)] {
                let num = key.numerical();
                assert_eq!(
                    Key::from_numerical(&num),
                    Some(key),
                    "Failed roundtrip for {}: {}",
                    key,
                    num
                );
            }
        }
    }

    #[test]
    fn test_sentinel_result() {
        let r = AnalysisResult::unknown();
        assert!(r.is_unknown());
        assert_eq!(r.key, "Unknown");
        assert_eq!(r.scale, "Unknown");
        assert_eq!(r.relative_key, "Unknown");
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.label(), "Unknown unknown");
        assert_eq!(r.tonic_index(), None);
        assert_eq!(r.detected_key(), None);
    }

    #[test]
    fn test_track_row_serializes_flat() {
        let row = TrackRow {
            file: "a.wav".to_string(),
            artist: "Artist".to_string(),
            track: "Song".to_string(),
            result: AnalysisResult::unknown(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["file"], "a.wav");
        assert_eq!(json["key"], "Unknown");
        assert_eq!(json["mode"], "unknown");
        assert!(json.get("result").is_none(), "result must be flattened");

        let back: TrackRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 3), 0.123);
        assert_eq!(round_to(119.96, 1), 120.0);
        assert_eq!(round_to(1523.44, 1), 1523.4);
    }
}
