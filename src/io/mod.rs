//! Audio I/O modules
//!
//! Collaborators of the batch analyzer: decoding with Symphonia, content
//! checksums and the result cache.

pub mod cache;
pub mod checksum;
pub mod decoder;

pub use cache::{DirectoryCache, MemoryCache, ResultCache};
pub use checksum::{Blake3Hasher, ContentHasher};
pub use decoder::{AudioLoader, SymphoniaLoader};
