#![forbid(unsafe_code)]

//! Text measurement without a rendering backend.
//!
//! The layout engine sizes text through the `TextMeasure` seam. This
//! crate provides the two implementations an embedder needs before (or
//! instead of) wiring up real shaping:
//!
//! - [`FallbackMeasure`]: a table-driven estimator using per-glyph
//!   advance ratios for printable ASCII, with greedy word wrapping.
//!   It keeps the engine fully functional with no font stack at all.
//! - [`MeasureCache`]: an LRU memoization wrapper around any measurer,
//!   with generation-based invalidation for font or DPI changes.

mod cached;
mod fallback;

pub use cached::{MeasureCache, MeasureCacheStats};
pub use fallback::FallbackMeasure;
