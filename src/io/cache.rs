//! Content-addressed result cache
//!
//! Entries are keyed by the checksum of the source file, so re-analysing an
//! unchanged file is a lookup. Writers of the same key store identical values,
//! which makes concurrent writes harmless.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::analysis::result::CacheEntry;
use crate::error::AnalysisError;

/// Storage for analysis results keyed by content checksum
pub trait ResultCache: Send + Sync {
    /// Cached entry for `id`, `None` on a miss
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::CacheError` if the store cannot be read
    fn get(&self, id: &str) -> Result<Option<CacheEntry>, AnalysisError>;

    /// Store `entry` under `id`, replacing any previous entry
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::CacheError` if the store cannot be written
    fn put(&self, id: &str, entry: &CacheEntry) -> Result<(), AnalysisError>;
}

impl<T: ResultCache + ?Sized> ResultCache for std::sync::Arc<T> {
    fn get(&self, id: &str) -> Result<Option<CacheEntry>, AnalysisError> {
        (**self).get(id)
    }

    fn put(&self, id: &str, entry: &CacheEntry) -> Result<(), AnalysisError> {
        (**self).put(id, entry)
    }
}

/// One JSON file per entry: `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    dir: PathBuf,
}

impl DirectoryCache {
    /// Open (and create if needed) a cache directory
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::CacheError` if the directory cannot be created
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AnalysisError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| AnalysisError::CacheError(format!("{}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove every cached entry, returning how many were deleted
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::CacheError` if the directory cannot be listed
    pub fn clear(&self) -> Result<usize, AnalysisError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| AnalysisError::CacheError(format!("{}: {}", self.dir.display(), e)))?;

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
            }
        }

        log::debug!("Cleared {} cache entries from {}", removed, self.dir.display());
        Ok(removed)
    }

    fn entry_path(&self, id: &str) -> Result<PathBuf, AnalysisError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(AnalysisError::CacheError(format!(
                "Invalid cache id: {:?}",
                id
            )));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

impl ResultCache for DirectoryCache {
    fn get(&self, id: &str) -> Result<Option<CacheEntry>, AnalysisError> {
        let path = self.entry_path(id)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AnalysisError::CacheError(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| AnalysisError::CacheError(format!("{}: {}", path.display(), e)))
    }

    fn put(&self, id: &str, entry: &CacheEntry) -> Result<(), AnalysisError> {
        let path = self.entry_path(id)?;
        let json = serde_json::to_string_pretty(entry)
            .map_err(|e| AnalysisError::CacheError(format!("{}: {}", path.display(), e)))?;
        fs::write(&path, json)
            .map_err(|e| AnalysisError::CacheError(format!("{}: {}", path.display(), e)))
    }
}

/// In-process cache, mostly for tests and one-shot batches
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, id: &str) -> Result<Option<CacheEntry>, AnalysisError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AnalysisError::CacheError("Memory cache lock poisoned".to_string()))?;
        Ok(entries.get(id).cloned())
    }

    fn put(&self, id: &str, entry: &CacheEntry) -> Result<(), AnalysisError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AnalysisError::CacheError("Memory cache lock poisoned".to_string()))?;
        entries.insert(id.to_string(), entry.clone());
        Ok(())
    }
}
