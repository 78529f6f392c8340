#![forbid(unsafe_code)]

//! Dirty tracking with ancestor propagation.
//!
//! Most frames touch a small fraction of the tree, so the solver must
//! never pay O(n) to find out what changed. The [`DirtyQueue`] is an
//! append-only list of marked handles plus an "already queued" bitset:
//! marking a node appends it and then walks its parent links, marking
//! each ancestor the same way. The walk stops at the first ancestor
//! that is already queued, which keeps repeated marks under a shared
//! parent from going quadratic.
//!
//! Marking also invalidates each newly-marked node's result-cache entry;
//! a dirty node's cached size is stale by definition (a descendant's
//! input changed even if its own style version did not), and clean
//! descendants keep their entries so the measure phase can skip their
//! subtrees.

use crate::cache::ResultCache;
use crate::store::{NodeId, NodeStore};

/// Fixed-capacity bitset over node slots.
struct BitWords {
    words: Vec<u64>,
}

impl BitWords {
    fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(64)],
        }
    }

    #[inline]
    fn test(&self, i: u32) -> bool {
        self.words[(i / 64) as usize] & (1 << (i % 64)) != 0
    }

    #[inline]
    fn set(&mut self, i: u32) {
        self.words[(i / 64) as usize] |= 1 << (i % 64);
    }

    #[inline]
    fn clear(&mut self, i: u32) {
        self.words[(i / 64) as usize] &= !(1 << (i % 64));
    }
}

/// Append-only queue of dirty handles with O(1) marking.
pub(crate) struct DirtyQueue {
    queue: Vec<NodeId>,
    queued: BitWords,
}

impl DirtyQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Vec::with_capacity(capacity),
            queued: BitWords::with_capacity(capacity),
        }
    }

    /// Mark `h` and every ancestor dirty, invalidating each marked
    /// node's cache entry. Stops at the first already-queued ancestor.
    pub(crate) fn mark(&mut self, h: NodeId, store: &mut NodeStore, cache: &mut ResultCache) {
        let mut cur = h;
        while !cur.is_none() && !self.queued.test(cur.raw()) {
            self.queued.set(cur.raw());
            self.queue.push(cur);
            store.set_dirty(cur);
            cache.invalidate(cur);
            cur = store.parent_of(cur);
        }
    }

    /// Drop a removed node from the queued set so a recycled slot can be
    /// marked again. Its stale queue entry is skipped at drain time.
    pub(crate) fn forget(&mut self, h: NodeId) {
        self.queued.clear(h.raw());
    }

    /// Number of handles currently queued (including stale entries for
    /// nodes removed since they were marked).
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Clear the queue and bitset after a compute pass, clearing the
    /// dirty flag of any queued node the placement walk did not visit.
    pub(crate) fn drain(&mut self, store: &mut NodeStore) {
        for &h in &self.queue {
            self.queued.clear(h.raw());
            if store.is_live(h) {
                store.clear_dirty(h);
            }
        }
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lithe_core::{NodeKind, Style};

    fn fixture() -> (NodeStore, ResultCache, DirtyQueue) {
        let store = NodeStore::with_capacity(64);
        let cache = ResultCache::with_capacity(64);
        let dirty = DirtyQueue::with_capacity(64);
        (store, cache, dirty)
    }

    #[test]
    fn mark_propagates_to_all_ancestors() {
        let (mut store, mut cache, mut dirty) = fixture();
        let root = store.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let mid = store.add(root, NodeKind::Container, Style::new()).unwrap();
        let leaf = store.add(mid, NodeKind::Container, Style::new()).unwrap();

        dirty.mark(leaf, &mut store, &mut cache);
        assert!(store.is_dirty(leaf));
        assert!(store.is_dirty(mid));
        assert!(store.is_dirty(root));
        assert_eq!(dirty.len(), 3);
    }

    #[test]
    fn mark_stops_at_queued_ancestor() {
        let (mut store, mut cache, mut dirty) = fixture();
        let root = store.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let a = store.add(root, NodeKind::Container, Style::new()).unwrap();
        let b = store.add(root, NodeKind::Container, Style::new()).unwrap();

        dirty.mark(a, &mut store, &mut cache);
        assert_eq!(dirty.len(), 2); // a + root

        // Sibling mark reuses the queued root: one new entry, not two.
        dirty.mark(b, &mut store, &mut cache);
        assert_eq!(dirty.len(), 3);

        // Re-marking is a no-op.
        dirty.mark(a, &mut store, &mut cache);
        assert_eq!(dirty.len(), 3);
    }

    #[test]
    fn mark_invalidates_cache_entries_along_the_walk() {
        let (mut store, mut cache, mut dirty) = fixture();
        let root = store.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let leaf = store.add(root, NodeKind::Container, Style::new()).unwrap();

        cache.store(root, 100.0, 100.0, 1, 50.0, 50.0);
        cache.store(leaf, 100.0, 100.0, 1, 20.0, 20.0);
        dirty.mark(leaf, &mut store, &mut cache);

        assert!(cache.lookup(leaf, 100.0, 100.0, 1).is_none());
        assert!(cache.lookup(root, 100.0, 100.0, 1).is_none());
    }

    #[test]
    fn drain_clears_flags_and_queue() {
        let (mut store, mut cache, mut dirty) = fixture();
        let root = store.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        dirty.mark(root, &mut store, &mut cache);
        dirty.drain(&mut store);
        assert_eq!(dirty.len(), 0);
        assert!(!store.is_dirty(root));

        // The slot can be marked again after a drain.
        dirty.mark(root, &mut store, &mut cache);
        assert_eq!(dirty.len(), 1);
    }

    #[test]
    fn forget_allows_recycled_slot_to_be_marked() {
        let (mut store, mut cache, mut dirty) = fixture();
        let root = store.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let child = store.add(root, NodeKind::Container, Style::new()).unwrap();
        dirty.mark(child, &mut store, &mut cache);

        let mut removed = Vec::new();
        store.remove_subtree(child, &mut removed).unwrap();
        for &h in &removed {
            dirty.forget(h);
        }

        // The recycled slot marks cleanly even before the next drain.
        let reused = store.add(root, NodeKind::Container, Style::new()).unwrap();
        assert_eq!(reused, child);
        dirty.mark(reused, &mut store, &mut cache);
        assert!(store.is_dirty(reused));
    }
}
