#![forbid(unsafe_code)]

//! Per-node result cache for the measure phase.
//!
//! Each node has one fixed-size entry recording the constraints its last
//! measurement ran under and the size that came out. A lookup hits only
//! when the available space and the node's style version both match
//! exactly; constraints are passed through unchanged from the parent's
//! measure, so exact float-bits equality is the correct comparison (no
//! epsilon).
//!
//! Hit/miss/invalidation counters are exposed for tuning; they are not
//! part of correctness.

use lithe_core::Size;

use crate::store::NodeId;

/// One cached measurement.
#[derive(Debug, Clone, Copy, Default)]
struct CacheEntry {
    avail_w: f32,
    avail_h: f32,
    style_version: u64,
    out_w: f32,
    out_h: f32,
    valid: bool,
}

/// Cumulative cache counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Lookups that returned a cached size.
    pub hits: u64,
    /// Lookups that fell through to a full measure.
    pub misses: u64,
    /// Entries explicitly invalidated by edits or dirty marking.
    pub invalidations: u64,
}

impl CacheStats {
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

/// Fixed-capacity array of per-node cache entries.
pub(crate) struct ResultCache {
    entries: Vec<CacheEntry>,
    stats: CacheStats,
}

impl ResultCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: vec![CacheEntry::default(); capacity],
            stats: CacheStats::default(),
        }
    }

    /// Return the cached size iff the entry is valid and was produced
    /// under exactly these constraints and this style version.
    pub(crate) fn lookup(
        &mut self,
        h: NodeId,
        avail_w: f32,
        avail_h: f32,
        style_version: u64,
    ) -> Option<Size> {
        let entry = &self.entries[h.raw() as usize];
        if entry.valid
            && entry.style_version == style_version
            && entry.avail_w.to_bits() == avail_w.to_bits()
            && entry.avail_h.to_bits() == avail_h.to_bits()
        {
            self.stats.hits += 1;
            Some(Size::new(entry.out_w, entry.out_h))
        } else {
            self.stats.misses += 1;
            None
        }
    }

    /// Overwrite the node's entry.
    pub(crate) fn store(
        &mut self,
        h: NodeId,
        avail_w: f32,
        avail_h: f32,
        style_version: u64,
        out_w: f32,
        out_h: f32,
    ) {
        self.entries[h.raw() as usize] = CacheEntry {
            avail_w,
            avail_h,
            style_version,
            out_w,
            out_h,
            valid: true,
        };
    }

    /// Clear the node's valid bit.
    pub(crate) fn invalidate(&mut self, h: NodeId) {
        let entry = &mut self.entries[h.raw() as usize];
        if entry.valid {
            entry.valid = false;
            self.stats.invalidations += 1;
        }
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_requires_exact_key_match() {
        let mut cache = ResultCache::with_capacity(8);
        let h = NodeId::from_raw(3);
        cache.store(h, 100.0, 50.0, 7, 80.0, 40.0);

        assert_eq!(cache.lookup(h, 100.0, 50.0, 7), Some(Size::new(80.0, 40.0)));
        assert_eq!(cache.lookup(h, 100.0, 50.0, 8), None);
        assert_eq!(cache.lookup(h, 100.5, 50.0, 7), None);
        assert_eq!(cache.lookup(h, 100.0, 49.0, 7), None);
    }

    #[test]
    fn infinite_available_space_is_a_valid_key() {
        let mut cache = ResultCache::with_capacity(8);
        let h = NodeId::from_raw(0);
        cache.store(h, f32::INFINITY, 50.0, 1, 120.0, 16.0);
        assert_eq!(
            cache.lookup(h, f32::INFINITY, 50.0, 1),
            Some(Size::new(120.0, 16.0))
        );
    }

    #[test]
    fn invalidate_clears_and_counts_once() {
        let mut cache = ResultCache::with_capacity(8);
        let h = NodeId::from_raw(1);
        cache.store(h, 10.0, 10.0, 1, 5.0, 5.0);
        cache.invalidate(h);
        cache.invalidate(h); // second call finds nothing to clear
        assert_eq!(cache.lookup(h, 10.0, 10.0, 1), None);
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn hit_rate_tracks_lookups() {
        let mut cache = ResultCache::with_capacity(8);
        let h = NodeId::from_raw(0);
        cache.store(h, 1.0, 1.0, 1, 1.0, 1.0);
        cache.lookup(h, 1.0, 1.0, 1);
        cache.lookup(h, 2.0, 1.0, 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
