#![forbid(unsafe_code)]

//! LRU memoization for text measurement.
//!
//! Measuring is the only part of layout whose cost the engine cannot
//! bound itself, so repeated measurements of unchanged strings should
//! not reach the backend twice. [`MeasureCache`] wraps any measurer and
//! caches results keyed by the full call signature.
//!
//! # Invalidation policy
//!
//! The cache tracks a monotonically increasing generation counter. Each
//! entry is stamped with the generation at insertion time. When global
//! state changes (font swap, DPI change, zoom), the embedder bumps the
//! generation via [`invalidate`](MeasureCache::invalidate). Entries from
//! older generations are treated as misses on access and lazily
//! replaced, avoiding a bulk clear.
//!
//! # Thread safety
//!
//! Not `Sync`; the engine that calls it is single-owner too. Use one
//! cache per engine instance.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use rustc_hash::FxHasher;

use lithe_core::{Size, TextMeasure};

/// Compact key over the full measurement signature.
///
/// Text and font name are folded to a 64-bit fingerprint rather than
/// owned, keeping probes allocation-free; the float inputs are compared
/// by bit pattern so `+inf` availability is an ordinary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MeasureKey {
    content_hash: u64,
    font_size_bits: u32,
    available_width_bits: u32,
}

impl MeasureKey {
    fn new(text: &str, font_name: Option<&str>, font_size: f32, available_width: f32) -> Self {
        let mut hasher = FxHasher::default();
        text.hash(&mut hasher);
        font_name.hash(&mut hasher);
        Self {
            content_hash: hasher.finish(),
            font_size_bits: font_size.to_bits(),
            available_width_bits: available_width.to_bits(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedEntry {
    size: Size,
    generation: u64,
}

/// Counters for cache effectiveness.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasureCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries found but stamped with an old generation.
    pub stale_evictions: u64,
}

impl MeasureCacheStats {
    /// Hit rate as a fraction (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner {
    cache: LruCache<MeasureKey, CachedEntry>,
    generation: u64,
    stats: MeasureCacheStats,
}

/// Memoizing wrapper around a [`TextMeasure`] backend.
///
/// Implements [`TextMeasure`] itself, so it drops in between the engine
/// and the real measurer.
pub struct MeasureCache<M: TextMeasure> {
    backend: M,
    inner: RefCell<Inner>,
}

impl<M: TextMeasure> MeasureCache<M> {
    /// Wrap `backend` with an LRU of `capacity` entries (minimum 1).
    pub fn new(backend: M, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1");
        Self {
            backend,
            inner: RefCell::new(Inner {
                cache: LruCache::new(cap),
                generation: 0,
                stats: MeasureCacheStats::default(),
            }),
        }
    }

    /// Invalidate all cached measurements by bumping the generation.
    pub fn invalidate(&mut self) {
        self.inner.get_mut().generation += 1;
    }

    /// Current counters.
    pub fn stats(&self) -> MeasureCacheStats {
        self.inner.borrow().stats
    }

    /// Cached entry count (including stale ones not yet replaced).
    pub fn len(&self) -> usize {
        self.inner.borrow().cache.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &M {
        &self.backend
    }
}

impl<M: TextMeasure> TextMeasure for MeasureCache<M> {
    fn measure(
        &self,
        text: &str,
        font_name: Option<&str>,
        font_size: f32,
        available_width: f32,
    ) -> Size {
        let key = MeasureKey::new(text, font_name, font_size, available_width);

        {
            let inner = &mut *self.inner.borrow_mut();
            if let Some(entry) = inner.cache.get(&key) {
                if entry.generation == inner.generation {
                    inner.stats.hits += 1;
                    return entry.size;
                }
                inner.stats.stale_evictions += 1;
            }
            inner.stats.misses += 1;
        }

        // Backend call happens outside the borrow; a backend that is
        // itself cached (or re-entrant) stays sound.
        let size = self.backend.measure(text, font_name, font_size, available_width);

        let inner = &mut *self.inner.borrow_mut();
        let generation = inner.generation;
        inner.cache.put(key, CachedEntry { size, generation });
        size
    }
}
