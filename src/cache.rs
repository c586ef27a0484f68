//! Parse cache for incremental catalog builds.
//!
//! Parsing is cheap per document but a catalog rebuild touches every document,
//! and most rebuilds follow an edit to just one of them. Because parsing is a
//! pure function of the document bytes, a previously parsed course can be
//! reused whenever the bytes are unchanged.
//!
//! # Design
//!
//! The cache is **content-addressed**: entries are keyed by
//! [`hash_document`], a SHA-256 over the parser grammar version and the raw
//! document text. Renaming or moving a document file does not invalidate its
//! entry; any byte change, or a bump of [`GRAMMAR_VERSION`], does.
//!
//! Only successfully parsed courses are cached. Failed documents are parsed
//! again on every build so fixes are picked up without a cache bust.
//!
//! ## Storage
//!
//! [`ParseCache::load`] and [`ParseCache::save`] persist the cache as JSON.
//! A missing, corrupt or version-mismatched file loads as an empty cache.

use crate::types::ParsedCourse;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::Path;

/// Version of the heading grammar. Bump when parser output changes shape
/// for the same input, so stale cached courses are discarded.
pub const GRAMMAR_VERSION: u32 = 1;

/// Version of the on-disk cache format.
const CACHE_VERSION: u32 = 1;

/// Parsed courses keyed by document content hash.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ParseCache {
    version: u32,
    grammar: u32,
    entries: HashMap<String, ParsedCourse>,
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::empty()
    }
}

impl ParseCache {
    /// Create an empty cache (the first build, or a cache file that is
    /// missing, unreadable or from another version).
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            grammar: GRAMMAR_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from a JSON file. Returns an empty cache if the file doesn't
    /// exist or can't be used (version mismatch, corruption).
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let cache: Self = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "discarding unreadable parse cache"
                );
                return Self::empty();
            }
        };
        if cache.version != CACHE_VERSION || cache.grammar != GRAMMAR_VERSION {
            return Self::empty();
        }
        cache
    }

    /// Save as JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    pub fn get(&self, content_hash: &str) -> Option<&ParsedCourse> {
        self.entries.get(content_hash)
    }

    pub fn insert(&mut self, content_hash: String, course: ParsedCourse) {
        self.entries.insert(content_hash, course);
    }

    /// Drop entries whose hash is not in `live`, so removed or edited
    /// documents don't accumulate forever.
    pub fn retain(&mut self, live: &HashSet<String>) {
        self.entries.retain(|hash, _| live.contains(hash));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SHA-256 of the grammar version and document text, as a hex string.
pub fn hash_document(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"course-document\0");
    hasher.update(GRAMMAR_VERSION.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a catalog build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} parsed ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} parsed", self.misses)
        }
    }
}
