#![forbid(unsafe_code)]

//! The text-measurer seam.
//!
//! The layout engine never shapes text itself. When the measure phase
//! reaches a text node it asks an injected [`TextMeasure`] for the
//! node's size under the current width constraint. Implementations live
//! outside the solver: a real shaping backend in the embedder, or the
//! table-driven fallback in `lithe-text`.

use crate::geometry::Size;

/// Sizes a run of text under a width constraint.
///
/// Contract:
/// - `available_width` may be `+inf`, meaning "natural single-line width".
/// - The returned size is a best effort; the measurer must not fail.
///   Degenerate inputs (empty text, zero font size) measure as zero.
/// - The measurer is called during layout and must not mutate the engine
///   (enforced by `&self`). A stateful cache behind interior mutability
///   or an `&mut`-free LRU wrapper is the implementer's concern.
pub trait TextMeasure {
    /// Measure `text` at `font_size`, wrapped to `available_width`.
    fn measure(
        &self,
        text: &str,
        font_name: Option<&str>,
        font_size: f32,
        available_width: f32,
    ) -> Size;
}

impl<M: TextMeasure + ?Sized> TextMeasure for &M {
    fn measure(
        &self,
        text: &str,
        font_name: Option<&str>,
        font_size: f32,
        available_width: f32,
    ) -> Size {
        (**self).measure(text, font_name, font_size, available_width)
    }
}

impl<M: TextMeasure + ?Sized> TextMeasure for Box<M> {
    fn measure(
        &self,
        text: &str,
        font_name: Option<&str>,
        font_size: f32,
        available_width: f32,
    ) -> Size {
        (**self).measure(text, font_name, font_size, available_width)
    }
}
