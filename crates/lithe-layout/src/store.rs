#![forbid(unsafe_code)]

//! Structure-of-arrays node storage.
//!
//! Every per-node field lives in its own parallel array indexed by a
//! 32-bit [`NodeId`]. Hot layout fields, cold spacing, opaque visual and
//! text styles, tree links, and computed results are separate arrays so
//! the solver touches only the cache lines a phase actually needs.
//!
//! Arrays are allocated once at construction for a fixed capacity; no
//! store operation allocates per-node memory afterwards (text strings
//! excepted, since content is caller-sized). Freed slots return to a
//! LIFO free list and the next `add` may reuse them.
//!
//! Tree links are a first-child/next-sibling list (plus a last-child
//! pointer so appends stay O(1)); insertion order is preserved because
//! it determines main-axis order.
//!
//! The store is the storage component only. [`LayoutEngine`] coordinates
//! dirty marking and cache invalidation around these operations; calling
//! the store directly is how the engine itself is built, not a public
//! entry point.
//!
//! [`LayoutEngine`]: crate::engine::LayoutEngine

use std::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;

use lithe_core::style::text_layout_eq;
use lithe_core::{
    AlignItems, Direction, JustifyContent, NodeKind, Rect, Sides, Size, Style, TextStyle,
    VisualStyle,
};

use crate::error::LayoutError;

/// Lightweight handle into the node store.
///
/// Handles are stable across frames and edits, and are recycled after
/// removal. [`NodeId::NONE`] is the "no node" sentinel used for absent
/// parents, children, and siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Sentinel meaning "no node".
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Create a NodeId from a raw u32 index.
    #[must_use]
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Get the raw u32 index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this is the "no node" sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "N-")
        } else {
            write!(f, "N{}", self.0)
        }
    }
}

bitflags! {
    /// Packed per-node state byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct NodeFlags: u8 {
        /// Slot holds a live node.
        const LIVE  = 1 << 0;
        /// Subtree not yet resolved under the current constraints.
        const DIRTY = 1 << 1;
        /// Touched by the reconciliation layer this frame.
        const SEEN  = 1 << 2;
    }
}

/// Hot layout fields, grouped to fit a cache line during measure/place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HotStyle {
    pub direction: Direction,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub width: f32,
    pub height: f32,
    pub min_width: f32,
    pub min_height: f32,
    pub max_width: f32,
    pub max_height: f32,
    pub gap: f32,
}

impl HotStyle {
    /// Clamp negative inputs to zero at set time, so the solver never
    /// sees a negative gap, minimum, or flex factor.
    fn sanitize(&mut self) {
        self.flex_grow = self.flex_grow.max(0.0);
        self.flex_shrink = self.flex_shrink.max(0.0);
        self.min_width = self.min_width.max(0.0);
        self.min_height = self.min_height.max(0.0);
        self.gap = self.gap.max(0.0);
    }

    fn from_style(style: &Style) -> Self {
        Self {
            direction: style.direction,
            justify_content: style.justify_content,
            align_items: style.align_items,
            flex_grow: style.flex_grow,
            flex_shrink: style.flex_shrink,
            width: style.width,
            height: style.height,
            min_width: style.min_width,
            min_height: style.min_height,
            max_width: style.max_width,
            max_height: style.max_height,
            gap: style.gap,
        }
    }
}

impl Default for HotStyle {
    fn default() -> Self {
        Self::from_style(&Style::default())
    }
}

/// Cold spacing fields, read only during placement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct SpacingStyle {
    pub padding: Sides,
    pub margin: Sides,
}

impl SpacingStyle {
    fn from_style(style: &Style) -> Self {
        Self {
            padding: style.padding,
            margin: style.margin,
        }
    }
}

/// Fixed-capacity SoA store for all per-node state.
pub(crate) struct NodeStore {
    capacity: usize,
    kind: Vec<NodeKind>,
    parent: Vec<NodeId>,
    first_child: Vec<NodeId>,
    last_child: Vec<NodeId>,
    next_sibling: Vec<NodeId>,
    hot: Vec<HotStyle>,
    spacing: Vec<SpacingStyle>,
    visual: Vec<VisualStyle>,
    text: Vec<Option<TextStyle>>,
    style_version: Vec<u64>,
    computed_size: Vec<Size>,
    computed_rect: Vec<Rect>,
    flags: Vec<NodeFlags>,
    /// Live roots in creation order, so compute never scans the slot
    /// arrays to find where to start.
    roots: Vec<NodeId>,
    /// Recycled slots, popped LIFO.
    free: Vec<u32>,
    /// High-water mark: slots at or beyond this index were never allocated.
    next_fresh: u32,
    live: usize,
}

impl NodeStore {
    /// Create a store with room for `capacity` live nodes. All arrays
    /// are allocated up front.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(u32::MAX as usize - 1);
        Self {
            capacity,
            kind: vec![NodeKind::default(); capacity],
            parent: vec![NodeId::NONE; capacity],
            first_child: vec![NodeId::NONE; capacity],
            last_child: vec![NodeId::NONE; capacity],
            next_sibling: vec![NodeId::NONE; capacity],
            hot: vec![HotStyle::default(); capacity],
            spacing: vec![SpacingStyle::default(); capacity],
            visual: vec![VisualStyle::default(); capacity],
            text: vec![None; capacity],
            style_version: vec![0; capacity],
            computed_size: vec![Size::ZERO; capacity],
            computed_rect: vec![Rect::ZERO; capacity],
            flags: vec![NodeFlags::empty(); capacity],
            roots: Vec::new(),
            free: Vec::with_capacity(capacity),
            next_fresh: 0,
            live: 0,
        }
    }

    // ── Validation ──────────────────────────────────────────────────

    pub(crate) fn is_live(&self, h: NodeId) -> bool {
        (h.0 as usize) < self.capacity && self.flags[h.0 as usize].contains(NodeFlags::LIVE)
    }

    fn check_live(&self, h: NodeId) -> Result<(), LayoutError> {
        if self.is_live(h) {
            Ok(())
        } else {
            Err(LayoutError::InvalidNode { node: h })
        }
    }

    // ── Mutating operations ─────────────────────────────────────────

    /// Allocate a node under `parent` (`NodeId::NONE` for a root) and
    /// append it to the parent's child list.
    pub(crate) fn add(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        style: Style,
    ) -> Result<NodeId, LayoutError> {
        if !parent.is_none() {
            self.check_live(parent)?;
        }
        let slot = if let Some(slot) = self.free.pop() {
            slot
        } else if (self.next_fresh as usize) < self.capacity {
            let slot = self.next_fresh;
            self.next_fresh += 1;
            slot
        } else {
            return Err(LayoutError::CapacityExceeded {
                capacity: self.capacity,
            });
        };

        let style = style.sanitized();
        let i = slot as usize;
        self.kind[i] = kind;
        self.parent[i] = NodeId::NONE;
        self.first_child[i] = NodeId::NONE;
        self.last_child[i] = NodeId::NONE;
        self.next_sibling[i] = NodeId::NONE;
        self.hot[i] = HotStyle::from_style(&style);
        self.spacing[i] = SpacingStyle::from_style(&style);
        self.visual[i] = style.visual;
        self.text[i] = style.text;
        self.style_version[i] = 1;
        self.computed_size[i] = Size::ZERO;
        self.computed_rect[i] = Rect::ZERO;
        self.flags[i] = NodeFlags::LIVE;
        self.live += 1;

        let h = NodeId(slot);
        self.append_child(parent, h);
        Ok(h)
    }

    /// Remove `h` and every descendant, pushing each freed handle onto
    /// `removed`. No-op on [`NodeId::NONE`].
    pub(crate) fn remove_subtree(
        &mut self,
        h: NodeId,
        removed: &mut Vec<NodeId>,
    ) -> Result<(), LayoutError> {
        if h.is_none() {
            return Ok(());
        }
        self.check_live(h)?;
        self.detach(h);

        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(h);
        while let Some(n) = stack.pop() {
            let mut child = self.first_child[n.0 as usize];
            while !child.is_none() {
                stack.push(child);
                child = self.next_sibling[child.0 as usize];
            }
            self.free_slot(n);
            removed.push(n);
        }
        Ok(())
    }

    /// Move `h` (with its subtree) to the end of `new_parent`'s child
    /// list. `new_parent` may be [`NodeId::NONE`] to make `h` a root.
    pub(crate) fn reparent(&mut self, h: NodeId, new_parent: NodeId) -> Result<(), LayoutError> {
        self.check_live(h)?;
        if !new_parent.is_none() {
            self.check_live(new_parent)?;
        }
        // Reject making a node its own ancestor. O(depth) ancestor walk.
        let mut cursor = new_parent;
        while !cursor.is_none() {
            if cursor == h {
                return Err(LayoutError::CycleDetected { node: h, new_parent });
            }
            cursor = self.parent[cursor.0 as usize];
        }
        self.detach(h);
        self.append_child(new_parent, h);
        Ok(())
    }

    /// Replace `h`'s style. Returns whether any layout-affecting field
    /// changed; if so, the node's style version is bumped. Visual fields
    /// are always updated and never bump the version.
    ///
    /// The comparison runs over the split arrays so that the per-frame
    /// restyle of an unchanged node allocates nothing; text is cloned
    /// only when it actually differs.
    pub(crate) fn set_style(&mut self, h: NodeId, style: &Style) -> Result<bool, LayoutError> {
        self.check_live(h)?;
        let i = h.0 as usize;
        let mut hot = HotStyle::from_style(style);
        hot.sanitize();
        let mut spacing = SpacingStyle::from_style(style);
        spacing.padding = spacing.padding.sanitized();
        spacing.margin = spacing.margin.sanitized();

        let changed = self.hot[i] != hot
            || self.spacing[i] != spacing
            || !text_layout_eq(self.text[i].as_ref(), style.text.as_ref());

        self.hot[i] = hot;
        self.spacing[i] = spacing;
        self.visual[i] = style.visual;
        if self.text[i] != style.text {
            self.text[i] = style.text.clone();
            if let Some(text) = &mut self.text[i] {
                text.font_size = text.font_size.max(0.0);
            }
        }
        if changed {
            self.style_version[i] += 1;
        }
        Ok(changed)
    }

    /// Change the node's kind. Returns whether it actually changed; a
    /// change affects intrinsic sizing, so it bumps the style version.
    pub(crate) fn set_kind(&mut self, h: NodeId, kind: NodeKind) -> Result<bool, LayoutError> {
        self.check_live(h)?;
        let i = h.0 as usize;
        if self.kind[i] == kind {
            return Ok(false);
        }
        self.kind[i] = kind;
        self.style_version[i] += 1;
        Ok(true)
    }

    // ── Link maintenance ────────────────────────────────────────────

    fn append_child(&mut self, parent: NodeId, h: NodeId) {
        self.parent[h.0 as usize] = parent;
        if parent.is_none() {
            self.roots.push(h);
            return;
        }
        let p = parent.0 as usize;
        let tail = self.last_child[p];
        if tail.is_none() {
            self.first_child[p] = h;
        } else {
            self.next_sibling[tail.0 as usize] = h;
        }
        self.last_child[p] = h;
    }

    /// Unlink `h` from its parent's child list (or the root list).
    /// O(siblings before `h`).
    fn detach(&mut self, h: NodeId) {
        let parent = self.parent[h.0 as usize];
        if parent.is_none() {
            self.roots.retain(|&r| r != h);
            self.next_sibling[h.0 as usize] = NodeId::NONE;
            return;
        }
        let p = parent.0 as usize;
        let next = self.next_sibling[h.0 as usize];
        if self.first_child[p] == h {
            self.first_child[p] = next;
        } else {
            let mut c = self.first_child[p];
            while !c.is_none() && self.next_sibling[c.0 as usize] != h {
                c = self.next_sibling[c.0 as usize];
            }
            if !c.is_none() {
                self.next_sibling[c.0 as usize] = next;
                if self.last_child[p] == h {
                    self.last_child[p] = c;
                }
            }
        }
        if self.last_child[p] == h {
            // h was the only child.
            self.last_child[p] = NodeId::NONE;
        }
        self.parent[h.0 as usize] = NodeId::NONE;
        self.next_sibling[h.0 as usize] = NodeId::NONE;
    }

    fn free_slot(&mut self, h: NodeId) {
        let i = h.0 as usize;
        self.flags[i] = NodeFlags::empty();
        self.parent[i] = NodeId::NONE;
        self.first_child[i] = NodeId::NONE;
        self.last_child[i] = NodeId::NONE;
        self.next_sibling[i] = NodeId::NONE;
        self.text[i] = None;
        self.live -= 1;
        self.free.push(h.0);
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn node_count(&self) -> usize {
        self.live
    }

    pub(crate) fn kind_of(&self, h: NodeId) -> NodeKind {
        self.kind[h.0 as usize]
    }

    pub(crate) fn parent_of(&self, h: NodeId) -> NodeId {
        self.parent[h.0 as usize]
    }

    pub(crate) fn first_child_of(&self, h: NodeId) -> NodeId {
        self.first_child[h.0 as usize]
    }

    pub(crate) fn next_sibling_of(&self, h: NodeId) -> NodeId {
        self.next_sibling[h.0 as usize]
    }

    pub(crate) fn hot(&self, h: NodeId) -> &HotStyle {
        &self.hot[h.0 as usize]
    }

    pub(crate) fn spacing(&self, h: NodeId) -> &SpacingStyle {
        &self.spacing[h.0 as usize]
    }

    pub(crate) fn text_of(&self, h: NodeId) -> Option<&TextStyle> {
        self.text[h.0 as usize].as_ref()
    }

    pub(crate) fn style_version_of(&self, h: NodeId) -> u64 {
        self.style_version[h.0 as usize]
    }

    /// Assemble the full user-facing style from the split arrays.
    pub(crate) fn style_of(&self, h: NodeId) -> Style {
        let i = h.0 as usize;
        let hot = &self.hot[i];
        Style {
            direction: hot.direction,
            justify_content: hot.justify_content,
            align_items: hot.align_items,
            flex_grow: hot.flex_grow,
            flex_shrink: hot.flex_shrink,
            width: hot.width,
            height: hot.height,
            min_width: hot.min_width,
            min_height: hot.min_height,
            max_width: hot.max_width,
            max_height: hot.max_height,
            gap: hot.gap,
            padding: self.spacing[i].padding,
            margin: self.spacing[i].margin,
            visual: self.visual[i],
            text: self.text[i].clone(),
        }
    }

    pub(crate) fn computed_rect_of(&self, h: NodeId) -> Rect {
        self.computed_rect[h.0 as usize]
    }

    pub(crate) fn set_computed_rect(&mut self, h: NodeId, rect: Rect) {
        self.computed_rect[h.0 as usize] = rect;
    }

    pub(crate) fn computed_size_of(&self, h: NodeId) -> Size {
        self.computed_size[h.0 as usize]
    }

    pub(crate) fn set_computed_size(&mut self, h: NodeId, size: Size) {
        self.computed_size[h.0 as usize] = size;
    }

    // ── Flags ───────────────────────────────────────────────────────

    pub(crate) fn is_dirty(&self, h: NodeId) -> bool {
        self.flags[h.0 as usize].contains(NodeFlags::DIRTY)
    }

    pub(crate) fn set_dirty(&mut self, h: NodeId) {
        self.flags[h.0 as usize].insert(NodeFlags::DIRTY);
    }

    pub(crate) fn clear_dirty(&mut self, h: NodeId) {
        self.flags[h.0 as usize].remove(NodeFlags::DIRTY);
    }

    pub(crate) fn is_seen(&self, h: NodeId) -> bool {
        self.flags[h.0 as usize].contains(NodeFlags::SEEN)
    }

    pub(crate) fn set_seen(&mut self, h: NodeId) {
        self.flags[h.0 as usize].insert(NodeFlags::SEEN);
    }

    pub(crate) fn clear_all_seen(&mut self) {
        for i in 0..self.next_fresh as usize {
            self.flags[i].remove(NodeFlags::SEEN);
        }
    }

    // ── Traversal helpers ───────────────────────────────────────────

    /// All live handles, in slot order.
    pub(crate) fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.next_fresh).filter_map(|i| {
            let h = NodeId(i);
            self.is_live(h).then_some(h)
        })
    }

    /// Push every live root onto `out`, in creation order.
    pub(crate) fn collect_roots(&self, out: &mut Vec<NodeId>) {
        out.extend_from_slice(&self.roots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> NodeStore {
        NodeStore::with_capacity(64)
    }

    fn children_of(s: &NodeStore, p: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut c = s.first_child_of(p);
        while !c.is_none() {
            out.push(c);
            c = s.next_sibling_of(c);
        }
        out
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut s = store();
        let root = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let a = s.add(root, NodeKind::Container, Style::new()).unwrap();
        let b = s.add(root, NodeKind::Container, Style::new()).unwrap();
        let c = s.add(root, NodeKind::Container, Style::new()).unwrap();
        assert_eq!(children_of(&s, root), vec![a, b, c]);
        assert_eq!(s.parent_of(b), root);
        assert_eq!(s.node_count(), 4);
    }

    #[test]
    fn add_rejects_dead_parent() {
        let mut s = store();
        let root = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let mut removed = Vec::new();
        s.remove_subtree(root, &mut removed).unwrap();
        let err = s.add(root, NodeKind::Container, Style::new()).unwrap_err();
        assert_eq!(err, LayoutError::InvalidNode { node: root });
    }

    #[test]
    fn capacity_is_enforced() {
        let mut s = NodeStore::with_capacity(2);
        s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let err = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap_err();
        assert_eq!(err, LayoutError::CapacityExceeded { capacity: 2 });
    }

    #[test]
    fn remove_is_recursive_and_recycles_lifo() {
        let mut s = store();
        let root = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let a = s.add(root, NodeKind::Container, Style::new()).unwrap();
        let a1 = s.add(a, NodeKind::Container, Style::new()).unwrap();
        let b = s.add(root, NodeKind::Container, Style::new()).unwrap();

        let mut removed = Vec::new();
        s.remove_subtree(a, &mut removed).unwrap();
        assert!(removed.contains(&a) && removed.contains(&a1));
        assert!(!s.is_live(a) && !s.is_live(a1));
        assert_eq!(children_of(&s, root), vec![b]);
        assert_eq!(s.node_count(), 2);

        // Freed handles are recycled by subsequent adds.
        let c = s.add(root, NodeKind::Container, Style::new()).unwrap();
        assert!(removed.contains(&c));
    }

    #[test]
    fn remove_none_is_a_no_op() {
        let mut s = store();
        let mut removed = Vec::new();
        assert!(s.remove_subtree(NodeId::NONE, &mut removed).is_ok());
        assert!(removed.is_empty());
    }

    #[test]
    fn detach_middle_child_keeps_list_consistent() {
        let mut s = store();
        let root = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let a = s.add(root, NodeKind::Container, Style::new()).unwrap();
        let b = s.add(root, NodeKind::Container, Style::new()).unwrap();
        let c = s.add(root, NodeKind::Container, Style::new()).unwrap();

        let mut removed = Vec::new();
        s.remove_subtree(b, &mut removed).unwrap();
        assert_eq!(children_of(&s, root), vec![a, c]);

        // Tail removal updates last_child: append still works.
        s.remove_subtree(c, &mut removed).unwrap();
        let d = s.add(root, NodeKind::Container, Style::new()).unwrap();
        assert_eq!(children_of(&s, root), vec![a, d]);
    }

    #[test]
    fn reparent_moves_to_end_and_rejects_cycles() {
        let mut s = store();
        let root = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let a = s.add(root, NodeKind::Container, Style::new()).unwrap();
        let b = s.add(a, NodeKind::Container, Style::new()).unwrap();
        let c = s.add(b, NodeKind::Container, Style::new()).unwrap();

        // a → c would make a its own ancestor.
        let err = s.reparent(a, c).unwrap_err();
        assert_eq!(
            err,
            LayoutError::CycleDetected {
                node: a,
                new_parent: c
            }
        );
        // The failed call left the tree unchanged.
        assert_eq!(s.parent_of(a), root);
        assert_eq!(children_of(&s, a), vec![b]);

        s.reparent(c, root).unwrap();
        assert_eq!(children_of(&s, root), vec![a, c]);
        assert_eq!(children_of(&s, b), Vec::<NodeId>::new());
    }

    #[test]
    fn reparent_to_same_parent_moves_to_tail() {
        let mut s = store();
        let root = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let a = s.add(root, NodeKind::Container, Style::new()).unwrap();
        let b = s.add(root, NodeKind::Container, Style::new()).unwrap();
        s.reparent(a, root).unwrap();
        assert_eq!(children_of(&s, root), vec![b, a]);
    }

    #[test]
    fn set_style_bumps_version_only_on_layout_change() {
        let mut s = store();
        let n = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        assert_eq!(s.style_version_of(n), 1);

        // Identical style: no bump.
        assert!(!s.set_style(n, &Style::new()).unwrap());
        assert_eq!(s.style_version_of(n), 1);

        // Visual-only edit: stored, but no bump.
        let mut visual_only = Style::new();
        visual_only.visual.background = 0xdead_beef;
        assert!(!s.set_style(n, &visual_only).unwrap());
        assert_eq!(s.style_version_of(n), 1);
        assert_eq!(s.style_of(n).visual.background, 0xdead_beef);

        // Layout edit: bump.
        assert!(s.set_style(n, &Style::new().width(42.0)).unwrap());
        assert_eq!(s.style_version_of(n), 2);
    }

    #[test]
    fn set_style_sanitizes_negative_gap() {
        let mut s = store();
        let n = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        s.set_style(n, &Style::new().gap(-5.0)).unwrap();
        assert_eq!(s.style_of(n).gap, 0.0);
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut s = store();
        let n = s.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
        let mut removed = Vec::new();
        s.remove_subtree(n, &mut removed).unwrap();
        assert!(s.set_style(n, &Style::new()).is_err());
        assert!(s.reparent(n, NodeId::NONE).is_err());
        assert!(!s.is_live(NodeId::from_raw(9999)));
    }
}
