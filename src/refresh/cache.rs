//! Time-expiring annotation count cache.
//!
//! Maps a normalized URL to the count most recently fetched for it. Shared
//! by every tab so two tabs on the same page cost one fetch. Expired
//! entries are dropped when read; there is no sweeper.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::time::Instant;

// ============================================================================
// CacheEntry
// ============================================================================

/// A cached count and its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheEntry {
    value: u64,
    expires_at: Instant,
}

impl CacheEntry {
    #[inline]
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

// ============================================================================
// AnnotationCountCache
// ============================================================================

/// Count cache keyed by normalized URL with a fixed entry lifetime.
#[derive(Debug)]
pub struct AnnotationCountCache {
    /// Entries by normalized URL.
    entries: Mutex<FxHashMap<String, CacheEntry>>,
    /// Lifetime applied on every `set`.
    expiration: Duration,
}

impl AnnotationCountCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(expiration: Duration) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            expiration,
        }
    }

    /// Returns the entry lifetime.
    #[inline]
    #[must_use]
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Returns the cached count for `url`, or `None` if absent or expired.
    pub fn get(&self, url: &str) -> Option<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get(url) {
            Some(entry) if entry.is_live(now) => Some(entry.value),
            Some(_) => {
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    /// Stores `count` for `url`, replacing any previous entry.
    pub fn set(&self, url: impl Into<String>, count: u64) {
        let entry = CacheEntry {
            value: count,
            expires_at: Instant::now() + self.expiration,
        };
        self.entries.lock().insert(url.into(), entry);
    }

    /// Returns the number of stored entries, including expired ones not yet read.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
