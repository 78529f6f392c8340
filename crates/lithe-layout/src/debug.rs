#![forbid(unsafe_code)]

//! Debug rendering of the live tree.
//!
//! Produces an indented one-line-per-node dump of handles, kinds,
//! computed rectangles, and dirty bits. Meant for logs and test
//! failure output, not for machine consumption.

use std::fmt::Write as _;

use crate::engine::LayoutEngine;
use crate::store::NodeId;

/// Render every root's subtree as an indented string.
///
/// ```text
/// N0 Container [0, 0, 200, 100]
///   N1 Text [0, 0, 120, 16]
///   N2 Container [0, 16, 200, 84] dirty
/// ```
#[must_use]
pub fn dump_tree(engine: &LayoutEngine) -> String {
    let mut out = String::new();
    let store = engine.store();
    let mut roots = Vec::new();
    store.collect_roots(&mut roots);
    for root in roots {
        dump_node(engine, root, 0, &mut out);
    }
    out
}

fn dump_node(engine: &LayoutEngine, node: NodeId, depth: usize, out: &mut String) {
    let store = engine.store();
    let rect = store.computed_rect_of(node);
    for _ in 0..depth {
        out.push_str("  ");
    }
    let _ = write!(
        out,
        "{node} {:?} [{}, {}, {}, {}]",
        store.kind_of(node),
        rect.x,
        rect.y,
        rect.width,
        rect.height
    );
    if store.is_dirty(node) {
        out.push_str(" dirty");
    }
    out.push('\n');

    let mut child = store.first_child_of(node);
    while !child.is_none() {
        dump_node(engine, child, depth + 1, out);
        child = store.next_sibling_of(child);
    }
}
