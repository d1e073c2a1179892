//! Per-worker memoization of finished encodings.

use ahash::AHashMap;

use crate::mode::Mode;

/// Maps raw tokens to their finished piece sequences.
///
/// Natural text repeats tokens heavily, so most lookups hit after a
/// short warm-up. Dropout results are stochastic, so the merge loop
/// bypasses the cache while dropout is active.
#[derive(Debug, Clone)]
pub struct Cache<M: Mode> {
    entries: AHashMap<M::Sym, Vec<M::Sym>>,
    hits: u64,
    misses: u64,
}

impl<M: Mode> Cache<M> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// The cached pieces for `token`, if present.
    pub fn get(&mut self, token: &M::Sym) -> Option<&[M::Sym]> {
        match self.entries.get(token) {
            Some(pieces) => {
                self.hits += 1;
                Some(pieces.as_slice())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Records the finished pieces for `token`.
    pub fn insert(&mut self, token: M::Sym, pieces: Vec<M::Sym>) {
        self.entries.insert(token, pieces);
    }

    /// Number of cached tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries and counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Usage counters since construction or the last clear.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

impl<M: Mode> Default for Cache<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached tokens.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that fell through to the merge loop.
    pub misses: u64,
}
