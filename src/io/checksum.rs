//! Content checksums used as cache keys

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::AnalysisError;

/// Read size when hashing files
const CHUNK_SIZE: usize = 64 * 1024;

/// Computes a stable identifier of a file's contents
pub trait ContentHasher: Send + Sync {
    /// Identifier of the bytes at `path`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::CacheError` if the file cannot be read
    fn hash(&self, path: &Path) -> Result<String, AnalysisError>;
}

impl<T: ContentHasher + ?Sized> ContentHasher for std::sync::Arc<T> {
    fn hash(&self, path: &Path) -> Result<String, AnalysisError> {
        (**self).hash(path)
    }
}

/// BLAKE3 digest of the file contents, lowercase hex
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl ContentHasher for Blake3Hasher {
    fn hash(&self, path: &Path) -> Result<String, AnalysisError> {
        let mut file = File::open(path)
            .map_err(|e| AnalysisError::CacheError(format!("{}: {}", path.display(), e)))?;

        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|e| AnalysisError::CacheError(format!("{}: {}", path.display(), e)))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(hasher.finalize().to_hex().to_string())
    }
}
