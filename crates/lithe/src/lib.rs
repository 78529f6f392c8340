#![forbid(unsafe_code)]

//! lithe public facade crate.
//!
//! An immediate-mode, incremental flexbox layout engine: a pure function
//! from a tree of styled boxes plus a viewport to a flat set of f32
//! rectangles, built for frames that touch a handful of nodes.
//!
//! Two surfaces over one node store:
//!
//! - [`Ui`]: the immediate-mode frame API
//!   (`begin_frame` / `begin_container` / `widget` / `end_frame`), which
//!   reconciles labels to stable handles across frames.
//! - [`LayoutEngine`]: raw handle-based operations
//!   (`add` / `reparent` / `set_style` / `compute` / `rect`) for
//!   embedders that retain their own model.
//!
//! ```
//! use lithe::{Direction, Style, Ui};
//!
//! let mut ui = Ui::new();
//! ui.begin_frame(640.0, 480.0);
//! ui.begin_container("toolbar", Style::new().direction(Direction::Row).height(32.0));
//! let save = ui.widget("save", Style::new().width(80.0));
//! ui.end_container();
//! ui.end_frame();
//!
//! assert_eq!(ui.rect(save).width, 80.0);
//! ```

pub mod ui;

// --- Core re-exports -------------------------------------------------------

pub use lithe_core::{
    AUTO, AlignItems, Direction, JustifyContent, NodeKind, Rect, Sides, Size, Style, TextMeasure,
    TextStyle, UNBOUNDED, VisualStyle,
};

// --- Layout re-exports -----------------------------------------------------

pub use lithe_layout::{
    CacheStats, ComputeStats, DEFAULT_CAPACITY, LayoutEngine, LayoutError, NodeId, debug,
};

// --- Text re-exports -------------------------------------------------------

pub use lithe_text::{FallbackMeasure, MeasureCache, MeasureCacheStats};

// --- Frame API -------------------------------------------------------------

pub use ui::Ui;

// --- Prelude ---------------------------------------------------------------

/// Commonly used types for frame code.
pub mod prelude {
    pub use crate::{
        AlignItems, Direction, JustifyContent, LayoutEngine, NodeId, NodeKind, Rect, Sides, Size,
        Style, Ui,
    };
}
