#![forbid(unsafe_code)]

//! Immediate-mode reconciliation over the retained engine.
//!
//! Frame code declares the tree it wants; [`Ui`] maps each declaration
//! to a stable engine handle and edits only what changed:
//!
//! ```
//! use lithe_core::{Direction, Style};
//! # use lithe::ui::Ui;
//!
//! let mut ui = Ui::new();
//! ui.begin_frame(800.0, 600.0);
//! let sidebar =
//!     ui.begin_container("sidebar", Style::new().direction(Direction::Column).width(200.0));
//! ui.widget("title", Style::new().text("Files", 14.0));
//! ui.end_container();
//! ui.end_frame();
//!
//! assert_eq!(ui.rect(sidebar).width, 200.0);
//! ```
//!
//! # Identity
//!
//! A widget's identity is `hash(parent scope id, label, repeat index)`.
//! The parent scope id is folded in, so the same label under different
//! containers names different nodes. Repeated labels *within* one scope
//! collide; disambiguate with [`widget_indexed`](Ui::widget_indexed) /
//! [`begin_container_indexed`](Ui::begin_container_indexed) (a duplicate
//! emission is reported at debug level and reuses the first node).
//!
//! Handles are stable: two frames declaring the same tree get the same
//! handles, style-identical declarations edit nothing, and nodes not
//! declared in a frame are removed (with their subtrees) at
//! [`end_frame`](Ui::end_frame), which then runs layout for the frame's
//! viewport.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use lithe_core::{NodeKind, Rect, Size, Style, TextMeasure};
use lithe_layout::{ComputeStats, DEFAULT_CAPACITY, LayoutEngine, NodeId};
use lithe_text::FallbackMeasure;

/// Seed for the implicit root scope.
const ROOT_SCOPE: u64 = 0x6c69_7468_6520_7569;

/// Stable widget id from scope, label, and repeat index.
fn child_id(scope: u64, label: &str, index: u32) -> u64 {
    let mut hasher = FxHasher::default();
    scope.hash(&mut hasher);
    label.hash(&mut hasher);
    index.hash(&mut hasher);
    hasher.finish()
}

/// One open container on the scope stack.
#[derive(Debug, Clone, Copy)]
struct ScopeFrame {
    id: u64,
    handle: NodeId,
    /// Last child emitted under this scope this frame; drives in-order
    /// sibling reconciliation.
    last_emitted: NodeId,
}

/// Immediate-mode frame builder sharing the engine's node store.
///
/// The engine itself stays reachable through [`engine`](Ui::engine) /
/// [`engine_mut`](Ui::engine_mut) for retained-mode edits; mixing the
/// two styles is supported as long as retained code does not remove
/// nodes the frame code still declares.
pub struct Ui {
    engine: LayoutEngine,
    ids: FxHashMap<u64, NodeId>,
    scopes: Vec<ScopeFrame>,
    root: NodeId,
    root_style: Style,
    viewport: Size,
    frame_open: bool,
}

impl Ui {
    /// A Ui with the default capacity and the table-driven fallback
    /// text measurer, so it works with no rendering backend installed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A Ui with a specific node capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_engine(LayoutEngine::with_capacity(
            capacity,
            Box::new(FallbackMeasure),
        ))
    }

    /// A Ui with a custom text measurer.
    #[must_use]
    pub fn with_measurer(measurer: Box<dyn TextMeasure>) -> Self {
        Self::with_engine(LayoutEngine::new(measurer))
    }

    fn with_engine(mut engine: LayoutEngine) -> Self {
        let root = engine
            .add(NodeId::NONE, NodeKind::Container, Style::new())
            .expect("fresh engine has room for the root");
        Self {
            engine,
            ids: FxHashMap::default(),
            scopes: Vec::new(),
            root,
            root_style: Style::new(),
            viewport: Size::ZERO,
            frame_open: false,
        }
    }

    /// Style template for the implicit root container. The viewport
    /// overrides its width/height every frame; everything else (layout
    /// direction, padding, background) is yours.
    pub fn set_root_style(&mut self, style: Style) {
        self.root_style = style;
    }

    /// Replace the text measurer.
    pub fn set_text_measurer(&mut self, measurer: Box<dyn TextMeasure>) {
        self.engine.set_text_measurer(measurer);
    }

    // ── Frame protocol ──────────────────────────────────────────────

    /// Start a frame against the given viewport. Clears all seen bits
    /// and resets the scope stack to the implicit root.
    pub fn begin_frame(&mut self, viewport_w: f32, viewport_h: f32) {
        if self.frame_open {
            tracing::warn!("begin_frame while a frame is already open");
        }
        self.frame_open = true;
        self.viewport = Size::new(viewport_w, viewport_h);
        self.engine.clear_seen();

        let mut style = self.root_style.clone();
        style.width = viewport_w;
        style.height = viewport_h;
        // No-op when the viewport and template are unchanged.
        let _ = self.engine.set_style(self.root, &style);
        self.engine.mark_seen(self.root);

        self.scopes.clear();
        self.scopes.push(ScopeFrame {
            id: ROOT_SCOPE,
            handle: self.root,
            last_emitted: NodeId::NONE,
        });
    }

    /// Open a container scope. Subsequent widgets attach to it until
    /// the matching [`end_container`](Ui::end_container).
    pub fn begin_container(&mut self, label: &str, style: Style) -> NodeId {
        self.begin_container_indexed(label, 0, style)
    }

    /// As [`begin_container`](Ui::begin_container), disambiguated by a
    /// repeat index for labels emitted in a loop.
    pub fn begin_container_indexed(&mut self, label: &str, index: u32, style: Style) -> NodeId {
        let (id, handle) = self.resolve(label, index, NodeKind::Container, &style);
        self.scopes.push(ScopeFrame {
            id,
            handle,
            last_emitted: NodeId::NONE,
        });
        handle
    }

    /// Close the current container scope.
    pub fn end_container(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        } else {
            tracing::warn!("end_container without a matching begin_container");
        }
    }

    /// Declare a leaf widget in the current scope. Kind is inferred:
    /// text style present means a text node, otherwise a plain box.
    pub fn widget(&mut self, label: &str, style: Style) -> NodeId {
        self.widget_indexed(label, 0, style)
    }

    /// As [`widget`](Ui::widget), disambiguated by a repeat index.
    pub fn widget_indexed(&mut self, label: &str, index: u32, style: Style) -> NodeId {
        let kind = if style.text.is_some() {
            NodeKind::Text
        } else {
            NodeKind::Container
        };
        self.widget_of_kind(label, index, kind, style)
    }

    /// Declare a leaf of an explicit kind (image/custom content).
    pub fn widget_of_kind(
        &mut self,
        label: &str,
        index: u32,
        kind: NodeKind,
        style: Style,
    ) -> NodeId {
        let (_, handle) = self.resolve(label, index, kind, &style);
        handle
    }

    /// Finish the frame: remove every node not declared since
    /// [`begin_frame`](Ui::begin_frame), then run layout against the
    /// frame's viewport. Returns the pass counters.
    pub fn end_frame(&mut self) -> ComputeStats {
        assert!(self.frame_open, "end_frame without begin_frame");
        if self.scopes.len() > 1 {
            tracing::warn!(open = self.scopes.len() - 1, "unclosed containers at end_frame");
        }
        self.frame_open = false;

        // Orphan sweep: anything not seen this frame goes, subtrees
        // included. Descendants of a removed node may already be gone
        // by the time the iteration reaches them.
        let root = self.root;
        let orphans: Vec<NodeId> = self
            .engine
            .live_nodes()
            .filter(|&h| h != root && !self.engine.is_seen(h))
            .collect();
        for orphan in orphans {
            if self.engine.is_live(orphan) {
                let _ = self.engine.remove(orphan);
            }
        }
        // Drop id mappings whose nodes were swept, before their slots
        // can be recycled.
        let engine = &self.engine;
        self.ids.retain(|_, &mut h| engine.is_live(h));

        self.engine.compute(self.viewport.width, self.viewport.height);
        self.engine.last_stats()
    }

    // ── Reconciliation core ─────────────────────────────────────────

    /// Map `(scope, label, index)` to a handle: reuse it in place,
    /// restyle it if the style differs, move it if it lives elsewhere,
    /// or create it.
    fn resolve(&mut self, label: &str, index: u32, kind: NodeKind, style: &Style) -> (u64, NodeId) {
        assert!(
            self.frame_open,
            "widgets can only be declared between begin_frame and end_frame"
        );
        let scope = *self.scopes.last().expect("scope stack holds at least the root");
        let id = child_id(scope.id, label, index);

        let existing = self
            .ids
            .get(&id)
            .copied()
            .filter(|&h| self.engine.is_live(h));

        let handle = match existing {
            Some(h) => {
                if self.engine.is_seen(h) {
                    tracing::debug!(label, index, "duplicate widget id in scope");
                }
                if self.engine.parent(h) == scope.handle {
                    // Same parent: verify the node sits right after the
                    // previously emitted sibling; if not, move it to the
                    // tail. Unmoved frames make this a pure comparison.
                    let in_order = if scope.last_emitted.is_none() {
                        self.engine.first_child(scope.handle) == h
                    } else {
                        self.engine.next_sibling(scope.last_emitted) == h
                    };
                    if !in_order {
                        let _ = self.engine.reparent(h, scope.handle);
                    }
                } else if let Err(err) = self.engine.reparent(h, scope.handle) {
                    tracing::warn!(label, error = %err, "could not move widget to its new scope");
                }
                let _ = self.engine.set_kind(h, kind);
                let _ = self.engine.set_style(h, style);
                h
            }
            None => match self.engine.add(scope.handle, kind, style.clone()) {
                Ok(h) => h,
                Err(err) => {
                    tracing::warn!(label, error = %err, "widget dropped");
                    return (id, NodeId::NONE);
                }
            },
        };

        self.engine.mark_seen(handle);
        self.ids.insert(id, handle);
        self.scopes.last_mut().expect("scope stack is non-empty").last_emitted = handle;
        (id, handle)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// The node's rectangle from the last [`end_frame`](Ui::end_frame),
    /// or the zero rect for an invalid handle.
    #[inline]
    pub fn rect(&self, h: NodeId) -> Rect {
        self.engine.rect(h)
    }

    /// The implicit root container.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The underlying engine, for queries and diagnostics.
    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    /// Mutable engine access for retained-mode edits.
    pub fn engine_mut(&mut self) -> &mut LayoutEngine {
        &mut self.engine
    }
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}
