//! Batch analysis of many tracks
//!
//! Per item, in input order:
//!
//! 1. checksum the file (when caching)
//! 2. return the cached result on a hit
//! 3. decode, trim to the analysis window and detect
//! 4. store the result (never a sentinel)
//! 5. attach the caller's artist/track metadata
//!
//! Any failure of steps 1 or 3 turns into the sentinel result; cache read or
//! write failures are logged and ignored. A batch always returns one row per
//! source.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::analysis::result::{AnalysisResult, CacheEntry, KeyTransition, TrackRow};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::io::{AudioLoader, Blake3Hasher, ContentHasher, MemoryCache, ResultCache, SymphoniaLoader};
use crate::preprocessing::window::trim_to_window;
use crate::KeyDetector;

/// Caller-supplied `(artist, track)` for a source path
pub type MetadataFn<'a> = &'a (dyn Fn(&Path) -> (String, String) + Sync);

/// Progress callback receiving `(completed, total)` after every item
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Batch behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Read and write the result cache (default: true)
    pub use_cache: bool,

    /// Worker threads; 1 runs items sequentially on the calling thread (default: 1)
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            jobs: 1,
        }
    }
}

/// Applies a [`KeyDetector`] to many files
pub struct BatchAnalyzer {
    detector: KeyDetector,
    loader: Box<dyn AudioLoader>,
    hasher: Box<dyn ContentHasher>,
    cache: Box<dyn ResultCache>,
    options: BatchOptions,
}

impl BatchAnalyzer {
    /// Analyzer with Symphonia decoding at the configured rate, BLAKE3
    /// checksums and an in-memory cache
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if `config` is invalid
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let loader = SymphoniaLoader::new(config.sample_rate);
        Ok(Self {
            detector: KeyDetector::new(config)?,
            loader: Box::new(loader),
            hasher: Box::new(Blake3Hasher),
            cache: Box::new(MemoryCache::new()),
            options: BatchOptions::default(),
        })
    }

    /// Replace the key detector
    pub fn with_detector(mut self, detector: KeyDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the audio loader
    pub fn with_loader(mut self, loader: impl AudioLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Replace the checksum function
    pub fn with_hasher(mut self, hasher: impl ContentHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    /// Replace the result cache
    pub fn with_cache(mut self, cache: impl ResultCache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    /// Replace the batch options
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Key detector used for every item
    pub fn detector(&self) -> &KeyDetector {
        &self.detector
    }

    /// Current batch options
    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Analyze one file; never fails
    ///
    /// `artist` and `track` are stored with the cache entry.
    pub fn analyze_one(&self, path: &Path, artist: &str, track: &str) -> AnalysisResult {
        let cache_id = if self.options.use_cache {
            match self.hasher.hash(path) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::warn!("{}: checksum failed: {}", path.display(), e);
                    return AnalysisResult::unknown();
                }
            }
        } else {
            None
        };

        if let Some(id) = &cache_id {
            match self.cache.get(id) {
                Ok(Some(entry)) => {
                    log::debug!("{}: cache hit ({})", path.display(), id);
                    return entry.result;
                }
                Ok(None) => {}
                Err(e) => log::warn!("{}: cache read failed, analysing: {}", path.display(), e),
            }
        }

        let result = match self.run_pipeline(path) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{}: analysis failed: {}", path.display(), e);
                return AnalysisResult::unknown();
            }
        };

        if let Some(id) = &cache_id {
            let entry = CacheEntry {
                artist: artist.to_string(),
                track: track.to_string(),
                result: result.clone(),
            };
            if let Err(e) = self.cache.put(id, &entry) {
                log::warn!("{}: cache write failed: {}", path.display(), e);
            }
        }

        result
    }

    fn run_pipeline(&self, path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let (samples, sample_rate) = self.loader.load(path)?;
        let window = trim_to_window(&samples, sample_rate, self.detector.config());
        self.detector.detect(window, sample_rate)
    }

    fn analyze_row(&self, path: &Path, metadata_fn: MetadataFn<'_>) -> TrackRow {
        let (artist, track) = metadata_fn(path);
        let result = self.analyze_one(path, &artist, &track);
        TrackRow {
            file: file_label(path),
            artist,
            track,
            result,
        }
    }

    /// Analyze every source, one row per source in input order
    ///
    /// # Arguments
    ///
    /// * `sources` - Audio file paths
    /// * `metadata_fn` - Supplies `(artist, track)` for a path
    /// * `progress` - Called with `(completed, total)` after every item
    pub fn analyze_batch<P>(
        &self,
        sources: &[P],
        metadata_fn: MetadataFn<'_>,
        progress: Option<ProgressFn<'_>>,
    ) -> Vec<TrackRow>
    where
        P: AsRef<Path> + Sync,
    {
        let total = sources.len();
        log::debug!(
            "Batch: {} sources, jobs={}, cache={}",
            total,
            self.options.jobs,
            self.options.use_cache
        );

        let completed = AtomicUsize::new(0);
        let process = |source: &P| {
            let row = self.analyze_row(source.as_ref(), metadata_fn);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(report) = progress {
                report(done, total);
            }
            row
        };

        if self.options.jobs > 1 && total > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.jobs)
                .build()
            {
                Ok(pool) => return pool.install(|| sources.par_iter().map(&process).collect()),
                Err(e) => log::warn!("Could not build thread pool, running sequentially: {}", e),
            }
        }

        sources.iter().map(process).collect()
    }
}

/// File name of `path`, or the whole path if it has none
fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Circular semitone distance between two tonics (0-6)
pub fn tonic_distance(a: u32, b: u32) -> u32 {
    let d = (a % 12).abs_diff(b % 12);
    d.min(12 - d)
}

/// Key movement between each pair of adjacent rows
///
/// Only tonics are compared; a row without a recognizable tonic (the
/// sentinel) counts as C.
pub fn compute_transitions(rows: &[TrackRow]) -> Vec<KeyTransition> {
    rows.windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let from = pair[0].result.tonic_index().unwrap_or(0);
            let to = pair[1].result.tonic_index().unwrap_or(0);
            KeyTransition {
                position: i + 1,
                from: pair[0].result.label(),
                to: pair[1].result.label(),
                distance: tonic_distance(from, to),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::{Key, Mode};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    const SR: u32 = 22050;

    fn tone(freq: f32, seconds: f32) -> Vec<f32> {
        (0..(seconds * SR as f32) as usize)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    /// Serves synthetic tones by file stem ("a", "e", "c"); "nan" and "inf" are an
    /// A tone with one corrupt sample; anything else fails to decode
    #[derive(Default)]
    struct ToneLoader {
        calls: AtomicUsize,
    }

    impl AudioLoader for ToneLoader {
        fn load(&self, path: &Path) -> Result<(Vec<f32>, u32), AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let stem = path.file_stem().and_then(|s| s.to_str());
            let freq = match stem {
                Some("a") | Some("nan") | Some("inf") => 440.0,
                Some("e") => 329.63,
                Some("c") => 523.25,
                _ => {
                    return Err(AnalysisError::DecodingError(format!(
                        "{}: unsupported",
                        path.display()
                    )))
                }
            };
            let mut samples = tone(freq, 3.0);
            match stem {
                Some("nan") => samples[SR as usize] = f32::NAN,
                Some("inf") => samples[SR as usize] = f32::INFINITY,
                _ => {}
            }
            Ok((samples, SR))
        }
    }

    /// File name as checksum; "unreadable" files cannot be hashed
    struct NameHasher;

    impl ContentHasher for NameHasher {
        fn hash(&self, path: &Path) -> Result<String, AnalysisError> {
            let name = file_label(path);
            if name.starts_with("unreadable") {
                return Err(AnalysisError::CacheError("permission denied".to_string()));
            }
            Ok(name.replace('.', "_"))
        }
    }

    struct FailingCache;

    impl ResultCache for FailingCache {
        fn get(&self, _id: &str) -> Result<Option<CacheEntry>, AnalysisError> {
            Err(AnalysisError::CacheError("disk gone".to_string()))
        }

        fn put(&self, _id: &str, _entry: &CacheEntry) -> Result<(), AnalysisError> {
            Err(AnalysisError::CacheError("disk gone".to_string()))
        }
    }

    fn metadata(path: &Path) -> (String, String) {
        ("Test Artist".to_string(), file_label(path))
    }

    fn analyzer(loader: Arc<ToneLoader>, cache: Arc<MemoryCache>) -> BatchAnalyzer {
        BatchAnalyzer::new(AnalysisConfig::default())
            .unwrap()
            .with_loader(loader)
            .with_hasher(NameHasher)
            .with_cache(cache)
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/music/{}", n))).collect()
    }

    fn row(key: Option<Key>) -> TrackRow {
        let mut result = AnalysisResult::unknown();
        if let Some(key) = key {
            result.key = key.tonic_name().to_string();
            result.mode = key.mode();
        }
        TrackRow {
            file: "x.wav".to_string(),
            artist: String::new(),
            track: String::new(),
            result,
        }
    }

    #[test]
    fn test_undecodable_source_yields_sentinel_row() {
        let loader = Arc::new(ToneLoader::default());
        let batch = analyzer(loader, Arc::new(MemoryCache::new()));
        let rows = batch.analyze_batch(&paths(&["a.wav", "broken.mp3", "e.wav"]), &metadata, None);

        assert_eq!(rows.len(), 3, "one row per source");
        assert_eq!(rows[0].result.key, "A");
        assert!(rows[1].result.is_unknown());
        assert_eq!(rows[1].result.key, "Unknown");
        assert_eq!(rows[1].result.confidence, 0.0);
        assert!(rows[1].result.alternatives.is_empty());
        assert_eq!(rows[1].file, "broken.mp3");
        assert_eq!(rows[1].artist, "Test Artist");
        assert_eq!(rows[2].result.key, "E");
    }

    #[test]
    fn test_non_finite_samples_yield_sentinel_row() {
        let cache = Arc::new(MemoryCache::new());
        let batch = analyzer(Arc::new(ToneLoader::default()), Arc::clone(&cache));
        let rows = batch.analyze_batch(&paths(&["nan.wav", "a.wav", "inf.wav"]), &metadata, None);

        assert_eq!(rows.len(), 3);
        for i in [0, 2] {
            let result = &rows[i].result;
            assert!(result.is_unknown(), "{} should be unknown, got {}", rows[i].file, result.label());
            assert_eq!(result.confidence, 0.0);
            assert!(result.energy.is_finite() && result.brightness.is_finite());
        }
        assert_eq!(rows[1].result.key, "A");
        assert_eq!(cache.len(), 1, "only the clean track is cached");
    }

    #[test]
    fn test_cache_hit_skips_loading() {
        let loader = Arc::new(ToneLoader::default());
        let cache = Arc::new(MemoryCache::new());
        let batch = analyzer(Arc::clone(&loader), Arc::clone(&cache));
        let sources = paths(&["a.wav"]);

        let first = batch.analyze_batch(&sources, &metadata, None);
        let second = batch.analyze_batch(&sources, &metadata, None);

        assert_eq!(loader.calls.load(Ordering::SeqCst), 1, "second run must hit the cache");
        assert_eq!(cache.len(), 1);
        assert_eq!(first, second);
        let entry = cache.get("a_wav").unwrap().unwrap();
        assert_eq!(entry.track, "a.wav");
    }

    #[test]
    fn test_sentinel_results_are_not_cached() {
        let cache = Arc::new(MemoryCache::new());
        let batch = analyzer(Arc::new(ToneLoader::default()), Arc::clone(&cache));
        batch.analyze_batch(&paths(&["broken.flac"]), &metadata, None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_can_be_disabled() {
        let loader = Arc::new(ToneLoader::default());
        let cache = Arc::new(MemoryCache::new());
        let batch = analyzer(Arc::clone(&loader), Arc::clone(&cache)).with_options(BatchOptions {
            use_cache: false,
            jobs: 1,
        });
        let sources = paths(&["a.wav"]);
        batch.analyze_batch(&sources, &metadata, None);
        batch.analyze_batch(&sources, &metadata, None);

        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_checksum_failure_is_sentinel() {
        let loader = Arc::new(ToneLoader::default());
        let batch = analyzer(Arc::clone(&loader), Arc::new(MemoryCache::new()));
        let result = batch.analyze_one(Path::new("/music/unreadable.wav"), "", "");
        assert!(result.is_unknown());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cache_failures_do_not_fail_the_item() {
        let batch = BatchAnalyzer::new(AnalysisConfig::default())
            .unwrap()
            .with_loader(ToneLoader::default())
            .with_hasher(NameHasher)
            .with_cache(FailingCache);
        let result = batch.analyze_one(Path::new("/music/a.wav"), "", "");
        assert_eq!(result.key, "A");
    }

    #[test]
    fn test_progress_reports_each_item() {
        let batch = analyzer(Arc::new(ToneLoader::default()), Arc::new(MemoryCache::new()));
        let seen = Mutex::new(Vec::new());
        let report = |done: usize, total: usize| seen.lock().unwrap().push((done, total));

        batch.analyze_batch(&paths(&["a.wav", "broken.ogg", "c.wav"]), &metadata, Some(&report));
        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_parallel_batch_preserves_order() {
        let batch = analyzer(Arc::new(ToneLoader::default()), Arc::new(MemoryCache::new()))
            .with_options(BatchOptions {
                use_cache: true,
                jobs: 2,
            });
        let seen = Mutex::new(Vec::new());
        let report = |done: usize, _total: usize| seen.lock().unwrap().push(done);

        let rows = batch.analyze_batch(&paths(&["c.wav", "a.wav", "e.wav", "x.wav"]), &metadata, Some(&report));
        let keys: Vec<&str> = rows.iter().map(|r| r.result.key.as_str()).collect();
        assert_eq!(keys, vec!["C", "A", "E", "Unknown"]);

        let mut done = seen.into_inner().unwrap();
        done.sort_unstable();
        assert_eq!(done, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = analyzer(Arc::new(ToneLoader::default()), Arc::new(MemoryCache::new()));
        let rows = batch.analyze_batch::<PathBuf>(&[], &metadata, None);
        assert!(rows.is_empty());
        assert!(compute_transitions(&rows).is_empty());
    }

    #[test]
    fn test_tonic_distance_bounds_and_symmetry() {
        for a in 0..12 {
            for b in 0..12 {
                let d = tonic_distance(a, b);
                assert!(d <= 6, "distance {} -> {} is {}", a, b, d);
                assert_eq!(d, tonic_distance(b, a));
            }
        }
        assert_eq!(tonic_distance(0, 7), 5);
        assert_eq!(tonic_distance(0, 6), 6);
        assert_eq!(tonic_distance(11, 0), 1);
    }

    #[test]
    fn test_compute_transitions() {
        let rows = vec![
            row(Some(Key::Major(0))),
            row(Some(Key::Major(7))),
            row(None),
            row(Some(Key::Minor(6))),
        ];
        let transitions = compute_transitions(&rows);

        assert_eq!(transitions.len(), 3);
        assert_eq!(transitions[0].position, 1);
        assert_eq!(transitions[0].from, "C major");
        assert_eq!(transitions[0].to, "G major");
        assert_eq!(transitions[0].distance, 5);
        // The sentinel row counts as C
        assert_eq!(transitions[1].to, "Unknown unknown");
        assert_eq!(transitions[1].distance, 5);
        assert_eq!(transitions[2].distance, 6);
        assert_eq!(rows[3].result.mode, Mode::Minor);
    }
}
