#![forbid(unsafe_code)]

//! The engine: store + dirty queue + cache + solver behind one handle API.
//!
//! [`LayoutEngine`] is a plain value owned by one caller at a time. Every
//! mutating operation keeps the bookkeeping honest — style edits bump
//! versions and mark dirty with ancestor propagation, structural edits
//! dirty the affected parents, removals recycle handles and drop their
//! cache entries — so that [`compute`](LayoutEngine::compute) can resolve
//! a frame in time proportional to the dirty set rather than the tree.
//!
//! Mutating operations are atomic: they either succeed with all
//! invariants holding or return an error with the store untouched, and
//! the last-known-good rectangles stay queryable either way. Queries
//! never error; invalid handles read as zero rects and sentinel links so
//! the render path stays branch-light.

use lithe_core::{NodeKind, Rect, Size, Style, TextMeasure};

use crate::cache::{CacheStats, ResultCache};
use crate::dirty::DirtyQueue;
use crate::error::LayoutError;
use crate::solver::{ScratchPool, Solver};
use crate::store::{NodeId, NodeStore};

/// Default node capacity for [`LayoutEngine::new`].
pub const DEFAULT_CAPACITY: usize = 4096;

/// Counters from the most recent compute pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComputeStats {
    /// Queued dirty handles when the pass started.
    pub dirty_at_entry: usize,
    /// Nodes that ran a full measure.
    pub measured: usize,
    /// Nodes whose rectangle was (re)assigned.
    pub placed: usize,
    /// Measure-phase result-cache hits.
    pub cache_hits: usize,
    /// Clean, unmoved subtrees the place phase skipped outright.
    pub skipped_subtrees: usize,
}

/// Incremental flexbox layout engine over a fixed-capacity node store.
///
/// # Example
///
/// ```
/// use lithe_core::{Direction, NodeKind, Size, Style, TextMeasure};
/// use lithe_layout::{LayoutEngine, NodeId};
///
/// struct NoText;
/// impl TextMeasure for NoText {
///     fn measure(&self, _: &str, _: Option<&str>, _: f32, _: f32) -> Size {
///         Size::ZERO
///     }
/// }
///
/// let mut engine = LayoutEngine::new(Box::new(NoText));
/// let root = engine
///     .add(
///         NodeId::NONE,
///         NodeKind::Container,
///         Style::new().direction(Direction::Column).width(100.0).height(100.0),
///     )
///     .unwrap();
/// let child = engine
///     .add(root, NodeKind::Container, Style::new().height(40.0))
///     .unwrap();
/// engine.compute(100.0, 100.0);
/// assert_eq!(engine.rect(child).width, 100.0);
/// ```
pub struct LayoutEngine {
    store: NodeStore,
    dirty: DirtyQueue,
    cache: ResultCache,
    scratch: ScratchPool,
    measurer: Box<dyn TextMeasure>,
    stats: ComputeStats,
    roots_buf: Vec<NodeId>,
    removed_buf: Vec<NodeId>,
}

impl LayoutEngine {
    /// Create an engine with the default capacity.
    #[must_use]
    pub fn new(measurer: Box<dyn TextMeasure>) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, measurer)
    }

    /// Create an engine with room for `capacity` live nodes. All node
    /// arrays are allocated here, once.
    #[must_use]
    pub fn with_capacity(capacity: usize, measurer: Box<dyn TextMeasure>) -> Self {
        Self {
            store: NodeStore::with_capacity(capacity),
            dirty: DirtyQueue::with_capacity(capacity),
            cache: ResultCache::with_capacity(capacity),
            scratch: ScratchPool::new(),
            measurer,
            stats: ComputeStats::default(),
            roots_buf: Vec::new(),
            removed_buf: Vec::new(),
        }
    }

    /// Replace the text measurer (e.g. swap the fallback for a real
    /// shaping backend). Existing text measurements are invalidated by
    /// the embedder touching the affected nodes.
    pub fn set_text_measurer(&mut self, measurer: Box<dyn TextMeasure>) {
        self.measurer = measurer;
    }

    // ── Mutating operations ─────────────────────────────────────────

    /// Create a node under `parent` ([`NodeId::NONE`] for a root),
    /// appended after its siblings.
    pub fn add(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        style: Style,
    ) -> Result<NodeId, LayoutError> {
        let h = self.store.add(parent, kind, style)?;
        // Marking dirties the new node and its ancestors, and drops any
        // stale cache entry a recycled slot may carry.
        self.dirty.mark(h, &mut self.store, &mut self.cache);
        Ok(h)
    }

    /// Remove `h` and its whole subtree, recycling their handles.
    /// No-op on [`NodeId::NONE`].
    pub fn remove(&mut self, h: NodeId) -> Result<(), LayoutError> {
        if h.is_none() {
            return Ok(());
        }
        if !self.store.is_live(h) {
            return Err(LayoutError::InvalidNode { node: h });
        }
        let parent = self.store.parent_of(h);
        if !parent.is_none() {
            self.dirty.mark(parent, &mut self.store, &mut self.cache);
        }
        let mut removed = std::mem::take(&mut self.removed_buf);
        removed.clear();
        self.store.remove_subtree(h, &mut removed)?;
        for &dead in &removed {
            self.cache.invalidate(dead);
            self.dirty.forget(dead);
        }
        self.removed_buf = removed;
        Ok(())
    }

    /// Move `h` (with its subtree) under `new_parent`, after its new
    /// siblings. Fails with [`LayoutError::CycleDetected`] when
    /// `new_parent` is `h` or one of its descendants.
    pub fn reparent(&mut self, h: NodeId, new_parent: NodeId) -> Result<(), LayoutError> {
        if !self.store.is_live(h) {
            return Err(LayoutError::InvalidNode { node: h });
        }
        let old_parent = self.store.parent_of(h);
        self.store.reparent(h, new_parent)?;
        if !old_parent.is_none() {
            self.dirty.mark(old_parent, &mut self.store, &mut self.cache);
        }
        if !new_parent.is_none() {
            self.dirty.mark(new_parent, &mut self.store, &mut self.cache);
        }
        self.dirty.mark(h, &mut self.store, &mut self.cache);
        Ok(())
    }

    /// Replace `h`'s style. Returns whether a layout-affecting field
    /// changed; visual-only edits are stored without dirtying anything.
    pub fn set_style(&mut self, h: NodeId, style: &Style) -> Result<bool, LayoutError> {
        let changed = self.store.set_style(h, style)?;
        if changed {
            self.dirty.mark(h, &mut self.store, &mut self.cache);
        }
        Ok(changed)
    }

    /// Change the node's kind (container/text/image/custom). Kind
    /// drives intrinsic sizing, so a change dirties the node.
    pub fn set_kind(&mut self, h: NodeId, kind: NodeKind) -> Result<bool, LayoutError> {
        let changed = self.store.set_kind(h, kind)?;
        if changed {
            self.dirty.mark(h, &mut self.store, &mut self.cache);
        }
        Ok(changed)
    }

    /// Resolve layout for every root under the given viewport.
    ///
    /// Total: never fails. Cost is proportional to the dirty set plus
    /// the children of dirty nodes; a fully clean tree under an
    /// unchanged viewport is a handful of cache probes.
    pub fn compute(&mut self, viewport_w: f32, viewport_h: f32) {
        let mut stats = ComputeStats {
            dirty_at_entry: self.dirty.len(),
            ..ComputeStats::default()
        };

        let mut roots = std::mem::take(&mut self.roots_buf);
        roots.clear();
        self.store.collect_roots(&mut roots);
        for &root in &roots {
            let mut solver = Solver {
                store: &mut self.store,
                cache: &mut self.cache,
                scratch: &mut self.scratch,
                measurer: self.measurer.as_ref(),
                stats: &mut stats,
            };
            let size = solver.measure(root, viewport_w, viewport_h);
            solver.place(root, Rect::from_size(size), 0);
        }
        self.roots_buf = roots;

        self.dirty.drain(&mut self.store);
        self.stats = stats;
        tracing::debug!(
            dirty_at_entry = self.stats.dirty_at_entry,
            measured = self.stats.measured,
            placed = self.stats.placed,
            cache_hits = self.stats.cache_hits,
            skipped_subtrees = self.stats.skipped_subtrees,
            "layout pass complete"
        );
    }

    // ── Queries (never error; zero/sentinel on invalid input) ───────

    /// The node's rectangle from the most recent compute, or the zero
    /// rect for an invalid handle.
    #[inline]
    pub fn rect(&self, h: NodeId) -> Rect {
        if self.store.is_live(h) {
            self.store.computed_rect_of(h)
        } else {
            Rect::ZERO
        }
    }

    /// The node's measured size, or zero for an invalid handle.
    #[inline]
    pub fn computed_size(&self, h: NodeId) -> Size {
        if self.store.is_live(h) {
            self.store.computed_size_of(h)
        } else {
            Size::ZERO
        }
    }

    /// The node's parent, or [`NodeId::NONE`].
    #[inline]
    pub fn parent(&self, h: NodeId) -> NodeId {
        if self.store.is_live(h) {
            self.store.parent_of(h)
        } else {
            NodeId::NONE
        }
    }

    /// The node's first child, or [`NodeId::NONE`].
    #[inline]
    pub fn first_child(&self, h: NodeId) -> NodeId {
        if self.store.is_live(h) {
            self.store.first_child_of(h)
        } else {
            NodeId::NONE
        }
    }

    /// The node's next sibling, or [`NodeId::NONE`].
    #[inline]
    pub fn next_sibling(&self, h: NodeId) -> NodeId {
        if self.store.is_live(h) {
            self.store.next_sibling_of(h)
        } else {
            NodeId::NONE
        }
    }

    /// The node's assembled style, if the handle is live.
    pub fn style(&self, h: NodeId) -> Option<Style> {
        self.store.is_live(h).then(|| self.store.style_of(h))
    }

    /// The node's kind, if the handle is live.
    pub fn kind(&self, h: NodeId) -> Option<NodeKind> {
        self.store.is_live(h).then(|| self.store.kind_of(h))
    }

    /// Whether the handle refers to a live node.
    #[inline]
    pub fn is_live(&self, h: NodeId) -> bool {
        self.store.is_live(h)
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    /// Live node count.
    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    /// Configured maximum live node count.
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Handles queued dirty since the last compute.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Whether the node is awaiting resolution. False for invalid handles.
    pub fn is_dirty(&self, h: NodeId) -> bool {
        self.store.is_live(h) && self.store.is_dirty(h)
    }

    /// Cumulative result-cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Counters from the most recent compute pass.
    pub fn last_stats(&self) -> ComputeStats {
        self.stats
    }

    // ── Frame-sweep support for the reconciliation layer ────────────

    /// Clear every live node's seen bit (start of frame).
    pub fn clear_seen(&mut self) {
        self.store.clear_all_seen();
    }

    /// Mark a node as touched this frame. Ignores invalid handles.
    pub fn mark_seen(&mut self, h: NodeId) {
        if self.store.is_live(h) {
            self.store.set_seen(h);
        }
    }

    /// Whether the node was touched this frame.
    pub fn is_seen(&self, h: NodeId) -> bool {
        self.store.is_live(h) && self.store.is_seen(h)
    }

    /// All live handles, in slot order.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.store.live_nodes()
    }

    pub(crate) fn store(&self) -> &NodeStore {
        &self.store
    }
}
