//! Content-addressed artifact cache for rendered diagrams and QR codes
//!
//! Artifacts are stored on disk under `{root}/{kind}/[{variant}/]{prefix}-{digest}.{ext}`.
//! The filesystem is the index: an entry exists once its primary output is
//! present, so the cache persists across runs and is shared by every entry
//! point pointed at the same root. Entries are never evicted by the cache.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

mod disk;
mod keys;

pub use disk::{ArtifactCache, CacheSettings, DEFAULT_CACHE_ROOT, DEFAULT_RENDER_TIMEOUT};
pub use keys::{ArtifactKind, ArtifactPaths, CacheKey, ImageFormat, Variant};

/// Number of hex characters kept from the SHA-256 digest.
///
/// 16 hex characters are 64 bits; collisions become likely only around
/// 2^32 distinct contents under one kind and variant. Collisions are not
/// detected: two colliding contents would share one artifact.
pub const DIGEST_LEN: usize = 16;

/// Deterministic fingerprint of artifact content, used in file names
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let full = format!("{:x}", hasher.finalize());
    full[..DIGEST_LEN].to_string()
}

/// Per-cache counters, reported after a document run
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub renders: u64,
    pub failures: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}
