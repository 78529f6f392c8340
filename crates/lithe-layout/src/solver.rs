#![forbid(unsafe_code)]

//! Two-phase flexbox solver.
//!
//! A compute pass runs measure then place over each root:
//!
//! - **Measure** (post-order): resolve every node's size under the space
//!   its parent offers. Clean nodes whose result cache matches the
//!   offered space are used as-is and their subtrees skipped; dirty
//!   nodes had their entries invalidated when they were marked, so they
//!   always re-measure.
//! - **Place** (pre-order): resolve positions. Free space along the main
//!   axis is distributed to grow factors, deficits are taken back by
//!   weighted shrink (factor × base size), results are clamped in one
//!   batched kernel call per container, and children are walked in
//!   insertion order (reverse directions walk backwards).
//!
//! Placement skips any child that is clean and landed on exactly its
//! previous rectangle; together with the measure cache this bounds a
//! pass to the dirty set plus the children of dirty nodes.
//!
//! Both phases are total: they never fail, they only write rectangles.
//! Recursion depth is UI nesting depth. Per-container batches live in a
//! per-depth scratch pool, so steady-state computes allocate nothing.

use lithe_core::{AlignItems, JustifyContent, NodeKind, Rect, Size, TextMeasure};

use crate::cache::ResultCache;
use crate::engine::ComputeStats;
use crate::store::{NodeId, NodeStore};

/// Reusable per-depth buffers for one container's child batch.
#[derive(Default)]
pub(crate) struct ScratchLevel {
    ids: Vec<NodeId>,
    /// Main-axis sizes; intrinsic at gather, final after distribution.
    mains: Vec<f32>,
    /// Padded lower clamp bounds.
    mins: Vec<f32>,
    /// Padded upper clamp bounds.
    maxs: Vec<f32>,
    /// Relative main-axis positions in walk order.
    pos: Vec<f32>,
    /// Leading margins in walk order.
    lead: Vec<f32>,
}

impl ScratchLevel {
    fn clear(&mut self) {
        self.ids.clear();
        self.mains.clear();
        self.mins.clear();
        self.maxs.clear();
        self.pos.clear();
        self.lead.clear();
    }
}

/// One scratch level per tree depth, reused across computes.
pub(crate) struct ScratchPool {
    levels: Vec<ScratchLevel>,
}

impl ScratchPool {
    pub(crate) fn new() -> Self {
        Self { levels: Vec::new() }
    }

    fn take(&mut self, depth: usize) -> ScratchLevel {
        if depth >= self.levels.len() {
            self.levels.resize_with(depth + 1, ScratchLevel::default);
        }
        std::mem::take(&mut self.levels[depth])
    }

    fn restore(&mut self, depth: usize, level: ScratchLevel) {
        self.levels[depth] = level;
    }
}

/// Borrowed view over the engine's parts for one compute pass.
pub(crate) struct Solver<'a> {
    pub(crate) store: &'a mut NodeStore,
    pub(crate) cache: &'a mut ResultCache,
    pub(crate) scratch: &'a mut ScratchPool,
    pub(crate) measurer: &'a dyn TextMeasure,
    pub(crate) stats: &'a mut ComputeStats,
}

/// Content-box space a node can offer its children along one axis: an
/// explicit style size already describes the content area and is used
/// as-is; auto-sized nodes forward the offered outer space minus their
/// own padding.
#[inline]
fn content_avail(explicit: f32, offered: f32, pad_sum: f32) -> f32 {
    if explicit >= 0.0 {
        explicit
    } else {
        (offered - pad_sum).max(0.0)
    }
}

#[inline]
fn rect_bits_eq(a: Rect, b: Rect) -> bool {
    a.x.to_bits() == b.x.to_bits()
        && a.y.to_bits() == b.y.to_bits()
        && a.width.to_bits() == b.width.to_bits()
        && a.height.to_bits() == b.height.to_bits()
}

/// Main-axis start offset and extra inter-child spacing for a justify
/// mode, given the leftover space after sizing. The space-distributing
/// modes never produce negative spacing.
fn justify_offsets(justify: JustifyContent, leftover: f32, n: usize) -> (f32, f32) {
    match justify {
        JustifyContent::Start => (0.0, 0.0),
        JustifyContent::Center => (leftover / 2.0, 0.0),
        JustifyContent::End => (leftover, 0.0),
        JustifyContent::SpaceBetween => {
            if n > 1 {
                (0.0, leftover.max(0.0) / (n - 1) as f32)
            } else {
                (0.0, 0.0)
            }
        }
        JustifyContent::SpaceAround => {
            if n > 0 {
                let spacing = leftover.max(0.0) / n as f32;
                (spacing / 2.0, spacing)
            } else {
                (0.0, 0.0)
            }
        }
        JustifyContent::SpaceEvenly => {
            if n > 0 {
                let spacing = leftover.max(0.0) / (n + 1) as f32;
                (spacing, spacing)
            } else {
                (0.0, 0.0)
            }
        }
    }
}

impl Solver<'_> {
    /// Resolve the node's size under `(avail_w, avail_h)`, bottom-up.
    ///
    /// Sizes are content-box: explicit `width`/`height` and the min/max
    /// bounds describe the content area, and the stored `computed_size`
    /// adds the node's own padding on top.
    pub(crate) fn measure(&mut self, node: NodeId, avail_w: f32, avail_h: f32) -> Size {
        let version = self.store.style_version_of(node);
        if let Some(size) = self.cache.lookup(node, avail_w, avail_h, version) {
            self.stats.cache_hits += 1;
            self.store.set_computed_size(node, size);
            return size;
        }
        self.stats.measured += 1;

        let hot = *self.store.hot(node);
        let padding = self.store.spacing(node).padding;
        let inner_w = content_avail(hot.width, avail_w, padding.horizontal());
        let inner_h = content_avail(hot.height, avail_h, padding.vertical());

        // Children are measured for every kind so their subtrees hold
        // valid sizes; the kind decides only how the node itself sizes.
        let mut main_total = 0.0f32;
        let mut cross_max = 0.0f32;
        let mut count = 0u32;
        let mut child = self.store.first_child_of(node);
        while !child.is_none() {
            let next = self.store.next_sibling_of(child);
            let size = self.measure(child, inner_w, inner_h);
            if hot.direction.is_row() {
                main_total += size.width;
                cross_max = cross_max.max(size.height);
            } else {
                main_total += size.height;
                cross_max = cross_max.max(size.width);
            }
            count += 1;
            child = next;
        }
        if count > 1 {
            main_total += hot.gap * (count - 1) as f32;
        }

        let (mut width, mut height) = match self.store.kind_of(node) {
            NodeKind::Container => {
                if hot.direction.is_row() {
                    (main_total, cross_max)
                } else {
                    (cross_max, main_total)
                }
            }
            NodeKind::Text => match self.store.text_of(node) {
                Some(text) => {
                    let size = self.measurer.measure(
                        &text.text,
                        text.font_name.as_deref(),
                        text.font_size,
                        inner_w,
                    );
                    (size.width, size.height)
                }
                None => (0.0, 0.0),
            },
            // Intrinsic size comes from the explicit style dimensions
            // resolved below; auto means zero.
            NodeKind::Image | NodeKind::Custom => (0.0, 0.0),
        };

        if hot.width >= 0.0 {
            width = hot.width;
        }
        if hot.height >= 0.0 {
            height = hot.height;
        }
        width = width.max(hot.min_width).min(hot.max_width);
        height = height.max(hot.min_height).min(hot.max_height);
        width += padding.horizontal();
        height += padding.vertical();

        let size = Size::new(width, height);
        self.store.set_computed_size(node, size);
        self.cache.store(node, avail_w, avail_h, version, width, height);
        size
    }

    /// Assign the node's rectangle and lay out its children, top-down.
    pub(crate) fn place(&mut self, node: NodeId, rect: Rect, depth: usize) {
        if !self.store.is_dirty(node) && rect_bits_eq(self.store.computed_rect_of(node), rect) {
            // Clean and unmoved: every descendant rect is still valid.
            self.stats.skipped_subtrees += 1;
            return;
        }
        self.store.set_computed_rect(node, rect);
        self.store.clear_dirty(node);
        self.stats.placed += 1;

        let first = self.store.first_child_of(node);
        if first.is_none() {
            return;
        }

        let hot = *self.store.hot(node);
        let padding = self.store.spacing(node).padding;
        let content = rect.inner(padding);
        let is_row = hot.direction.is_row();
        let (content_main, content_cross) = if is_row {
            (content.width, content.height)
        } else {
            (content.height, content.width)
        };

        let mut level = self.scratch.take(depth);
        level.clear();

        // Gather: intrinsic mains and padded clamp bounds. Bounds are
        // padded because computed sizes include each child's padding
        // while the style bounds describe its content box.
        let mut margin_main_total = 0.0f32;
        let mut child = first;
        while !child.is_none() {
            let size = self.store.computed_size_of(child);
            let child_hot = self.store.hot(child);
            let child_pad = self.store.spacing(child).padding;
            let margin = self.store.spacing(child).margin;
            let (main, pad_main, min_main, max_main, margin_main) = if is_row {
                (
                    size.width,
                    child_pad.horizontal(),
                    child_hot.min_width,
                    child_hot.max_width,
                    margin.horizontal(),
                )
            } else {
                (
                    size.height,
                    child_pad.vertical(),
                    child_hot.min_height,
                    child_hot.max_height,
                    margin.vertical(),
                )
            };
            level.ids.push(child);
            level.mains.push(main);
            level.mins.push(min_main + pad_main);
            level.maxs.push(max_main + pad_main);
            margin_main_total += margin_main;
            child = self.store.next_sibling_of(child);
        }

        let n = level.ids.len();
        let gap_total = if n > 1 { hot.gap * (n - 1) as f32 } else { 0.0 };
        let intrinsic_total: f32 = level.mains.iter().sum();
        let free_space = content_main - intrinsic_total - gap_total;

        let mut total_grow = 0.0f32;
        let mut scaled_shrink_total = 0.0f32;
        let mut last_grow = usize::MAX;
        for (i, &id) in level.ids.iter().enumerate() {
            let child_hot = self.store.hot(id);
            total_grow += child_hot.flex_grow;
            scaled_shrink_total += child_hot.flex_shrink * level.mains[i];
            if child_hot.flex_grow > 0.0 {
                last_grow = i;
            }
        }

        if free_space > 0.0 && total_grow > 0.0 {
            // Proportional growth; the rounding residue goes to the last
            // flexible child so the mains sum to the content main exactly.
            let mut distributed = 0.0f32;
            for (i, &id) in level.ids.iter().enumerate() {
                let grow = self.store.hot(id).flex_grow;
                if grow <= 0.0 {
                    continue;
                }
                let share = if i == last_grow {
                    free_space - distributed
                } else {
                    free_space * grow / total_grow
                };
                level.mains[i] += share;
                distributed += share;
            }
        } else if free_space < 0.0 && scaled_shrink_total > 0.0 {
            // Weighted shrink: larger children give up proportionally
            // more, scaled by their shrink factor.
            let deficit = -free_space;
            for (i, &id) in level.ids.iter().enumerate() {
                let shrink = self.store.hot(id).flex_shrink;
                if shrink <= 0.0 {
                    continue;
                }
                level.mains[i] -= deficit * shrink * level.mains[i] / scaled_shrink_total;
            }
        }

        lithe_simd::clamp(&mut level.mains, &level.mins, &level.maxs);

        let used: f32 = level.mains.iter().sum::<f32>() + gap_total + margin_main_total;
        let leftover = content_main - used;
        let (mut cursor, between_extra) = justify_offsets(hot.justify_content, leftover, n);

        // Walk in placement order recording cursor positions, then fold
        // the leading margins in with one batched add.
        let reverse = hot.direction.is_reverse();
        for k in 0..n {
            let j = if reverse { n - 1 - k } else { k };
            let margin = self.store.spacing(level.ids[j]).margin;
            let (lead, trail) = if is_row {
                (margin.left, margin.right)
            } else {
                (margin.top, margin.bottom)
            };
            level.pos.push(cursor);
            level.lead.push(lead);
            cursor += lead + level.mains[j] + trail;
            if k + 1 < n {
                cursor += hot.gap + between_extra;
            }
        }
        lithe_simd::add_offsets(&mut level.pos, &level.lead);

        for k in 0..n {
            let j = if reverse { n - 1 - k } else { k };
            let id = level.ids[j];
            let child_hot = *self.store.hot(id);
            let spacing = *self.store.spacing(id);
            let size = self.store.computed_size_of(id);

            let (cross_intrinsic, cross_is_auto, min_cross, max_cross, cross_pad) = if is_row {
                (
                    size.height,
                    child_hot.height < 0.0,
                    child_hot.min_height,
                    child_hot.max_height,
                    spacing.padding.vertical(),
                )
            } else {
                (
                    size.width,
                    child_hot.width < 0.0,
                    child_hot.min_width,
                    child_hot.max_width,
                    spacing.padding.horizontal(),
                )
            };
            let (lead_cross, margin_cross) = if is_row {
                (spacing.margin.top, spacing.margin.vertical())
            } else {
                (spacing.margin.left, spacing.margin.horizontal())
            };

            let cross_avail = (content_cross - margin_cross).max(0.0);
            // Stretch fills the container's cross axis, but an explicit
            // cross size wins and stays put at the start edge.
            let cross_size = if cross_is_auto && hot.align_items == AlignItems::Stretch {
                cross_avail
                    .max(min_cross + cross_pad)
                    .min(max_cross + cross_pad)
            } else {
                cross_intrinsic
            };
            let cross_rel = match hot.align_items {
                AlignItems::Start | AlignItems::Stretch => 0.0,
                AlignItems::Center => (cross_avail - cross_size) / 2.0,
                AlignItems::End => cross_avail - cross_size,
            };

            let main_pos = level.pos[k];
            let child_rect = if is_row {
                Rect::new(
                    content.x + main_pos,
                    content.y + lead_cross + cross_rel,
                    level.mains[j],
                    cross_size,
                )
            } else {
                Rect::new(
                    content.x + lead_cross + cross_rel,
                    content.y + main_pos,
                    cross_size,
                    level.mains[j],
                )
            };
            self.place(id, child_rect, depth + 1);
        }

        self.scratch.restore(depth, level);
    }
}
