//! Incrementality guarantees: idempotent computes, local updates,
//! cycle rejection, and cache soundness against a from-scratch layout.

use lithe_core::{Direction, NodeKind, Rect, Size, Style, TextMeasure};
use lithe_layout::{LayoutEngine, LayoutError, NodeId};

struct NoText;

impl TextMeasure for NoText {
    fn measure(&self, _: &str, _: Option<&str>, _: f32, _: f32) -> Size {
        Size::ZERO
    }
}

fn engine(capacity: usize) -> LayoutEngine {
    LayoutEngine::with_capacity(capacity, Box::new(NoText))
}

/// Root → `sections` columns → `rows` rows → `leaves` leaves.
fn build_grid(
    e: &mut LayoutEngine,
    sections: usize,
    rows: usize,
    leaves: usize,
) -> (NodeId, Vec<NodeId>) {
    let root = e
        .add(
            NodeId::NONE,
            NodeKind::Container,
            Style::new().direction(Direction::Column).width(1920.0).height(1080.0),
        )
        .unwrap();
    let mut all_leaves = Vec::new();
    for _ in 0..sections {
        let section = e
            .add(root, NodeKind::Container, Style::new().flex_grow(1.0))
            .unwrap();
        for _ in 0..rows {
            let row = e
                .add(
                    section,
                    NodeKind::Container,
                    Style::new().direction(Direction::Column).flex_grow(1.0),
                )
                .unwrap();
            for _ in 0..leaves {
                let leaf = e
                    .add(row, NodeKind::Container, Style::new().flex_grow(1.0))
                    .unwrap();
                all_leaves.push(leaf);
            }
        }
    }
    (root, all_leaves)
}

fn all_rects(e: &LayoutEngine) -> Vec<(NodeId, Rect)> {
    e.live_nodes().map(|h| (h, e.rect(h))).collect()
}

/// Rebuild the current tree in a fresh engine and return the rect each
/// original handle would get from a from-scratch layout.
fn from_scratch_rects(e: &LayoutEngine, viewport: (f32, f32)) -> Vec<(NodeId, Rect)> {
    let mut fresh = engine(e.capacity());
    let mut mapping: Vec<(NodeId, NodeId)> = Vec::new();

    fn clone_subtree(
        src: &LayoutEngine,
        dst: &mut LayoutEngine,
        node: NodeId,
        dst_parent: NodeId,
        mapping: &mut Vec<(NodeId, NodeId)>,
    ) {
        let style = src.style(node).unwrap();
        let kind = src.kind(node).unwrap();
        let copy = dst.add(dst_parent, kind, style).unwrap();
        mapping.push((node, copy));
        let mut child = src.first_child(node);
        while !child.is_none() {
            clone_subtree(src, dst, child, copy, mapping);
            child = src.next_sibling(child);
        }
    }

    let roots: Vec<NodeId> = e.live_nodes().filter(|&h| e.parent(h).is_none()).collect();
    for root in roots {
        clone_subtree(e, &mut fresh, root, NodeId::NONE, &mut mapping);
    }
    fresh.compute(viewport.0, viewport.1);
    mapping
        .into_iter()
        .map(|(orig, copy)| (orig, fresh.rect(copy)))
        .collect()
}

fn assert_matches_from_scratch(e: &LayoutEngine, viewport: (f32, f32)) {
    for (h, expected) in from_scratch_rects(e, viewport) {
        assert_eq!(e.rect(h), expected, "node {h} diverged from full layout");
    }
}

#[test]
fn repeated_compute_is_idempotent() {
    let mut e = engine(256);
    let (_, leaves) = build_grid(&mut e, 3, 3, 3);

    e.compute(1920.0, 1080.0);
    let first = all_rects(&e);

    e.compute(1920.0, 1080.0);
    assert_eq!(e.last_stats().dirty_at_entry, 0);
    assert_eq!(e.last_stats().measured, 0);
    assert_eq!(all_rects(&e), first);
    assert!(!leaves.iter().any(|&l| e.is_dirty(l)));
}

#[test]
fn leaf_edit_re_measures_only_its_spine() {
    let mut e = engine(2048);
    let (_, leaves) = build_grid(&mut e, 10, 10, 10);
    assert_eq!(e.node_count(), 1111);
    e.compute(1920.0, 1080.0);
    let before = all_rects(&e);

    // A layout-affecting edit that cannot change any resulting size:
    // shrink factors are unused while free space is non-negative.
    let leaf = leaves[555];
    let mut style = e.style(leaf).unwrap();
    style.flex_shrink = 0.5;
    assert!(e.set_style(leaf, &style).unwrap());
    e.compute(1920.0, 1080.0);

    // Only the leaf-to-root spine re-measures (depth 4).
    assert!(
        e.last_stats().measured <= 4,
        "measured {} nodes",
        e.last_stats().measured
    );
    assert_eq!(all_rects(&e), before, "rects must be byte-identical");
}

#[test]
fn sibling_subtrees_are_skipped_when_one_changes() {
    let mut e = engine(256);
    let (_, leaves) = build_grid(&mut e, 2, 2, 2);
    e.compute(1920.0, 1080.0);

    // A real size change in one subtree.
    let leaf = leaves[0];
    let mut style = e.style(leaf).unwrap();
    style.min_height = 5.0;
    e.set_style(leaf, &style).unwrap();
    e.compute(1920.0, 1080.0);

    // The other section's subtree (1 section + 2 rows + 4 leaves) never
    // re-measured; only cache probes and placement checks touched it.
    let stats = e.last_stats();
    assert!(stats.measured < 11, "measured {}", stats.measured);
    assert_matches_from_scratch(&e, (1920.0, 1080.0));
}

#[test]
fn viewport_resize_recomputes_but_keeps_fixed_subtrees_cached() {
    let mut e = engine(64);
    let root = e
        .add(
            NodeId::NONE,
            NodeKind::Container,
            Style::new().direction(Direction::Row),
        )
        .unwrap();
    let fixed = e
        .add(root, NodeKind::Container, Style::new().width(200.0).height(200.0))
        .unwrap();
    for _ in 0..5 {
        e.add(fixed, NodeKind::Container, Style::new().flex_grow(1.0))
            .unwrap();
    }
    e.compute(800.0, 600.0);

    // Resize: the root re-measures under the new constraints, but the
    // fixed panel offers its children identical space, so their cached
    // sizes hold.
    e.compute(1024.0, 768.0);
    let stats = e.last_stats();
    assert!(stats.measured <= 2, "measured {}", stats.measured);
    assert_eq!(e.rect(fixed).size(), Size::new(200.0, 200.0));
}

#[test]
fn reparent_cycle_is_rejected_and_tree_unchanged() {
    let mut e = engine(64);
    let a = e.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
    let b = e.add(a, NodeKind::Container, Style::new()).unwrap();
    let c = e.add(b, NodeKind::Container, Style::new()).unwrap();
    e.compute(100.0, 100.0);

    let err = e.reparent(a, c).unwrap_err();
    assert_eq!(
        err,
        LayoutError::CycleDetected {
            node: a,
            new_parent: c
        }
    );
    assert_eq!(e.parent(b), a);
    assert_eq!(e.parent(c), b);
    assert_eq!(e.parent(a), NodeId::NONE);
    assert_eq!(e.dirty_count(), 0, "failed reparent must not dirty anything");
}

#[test]
fn edits_between_computes_match_full_layout() {
    let mut e = engine(256);
    let (root, leaves) = build_grid(&mut e, 3, 2, 2);
    e.compute(1280.0, 720.0);

    // Structural edit: move a leaf up two levels.
    let moved = leaves[3];
    e.reparent(moved, root).unwrap();
    e.compute(1280.0, 720.0);
    assert_matches_from_scratch(&e, (1280.0, 720.0));

    // Style edit.
    let mut style = e.style(leaves[7]).unwrap();
    style.flex_grow = 3.0;
    style.margin = lithe_core::Sides::uniform(2.0);
    e.set_style(leaves[7], &style).unwrap();
    e.compute(1280.0, 720.0);
    assert_matches_from_scratch(&e, (1280.0, 720.0));

    // Removal.
    e.remove(leaves[0]).unwrap();
    e.compute(1280.0, 720.0);
    assert_matches_from_scratch(&e, (1280.0, 720.0));

    // Viewport change.
    e.compute(640.0, 480.0);
    assert_matches_from_scratch(&e, (640.0, 480.0));
}

#[test]
fn removal_dirties_the_parent_chain() {
    let mut e = engine(64);
    let root = e.add(NodeId::NONE, NodeKind::Container, Style::new()).unwrap();
    let mid = e.add(root, NodeKind::Container, Style::new()).unwrap();
    let leaf = e.add(mid, NodeKind::Container, Style::new()).unwrap();
    e.compute(100.0, 100.0);

    e.remove(leaf).unwrap();
    assert!(e.is_dirty(mid));
    assert!(e.is_dirty(root));
}
