#![forbid(unsafe_code)]

//! Core value types for the lithe layout engine.
//!
//! This crate holds the plain data the rest of the workspace agrees on:
//! f32 geometry ([`Rect`], [`Size`], [`Sides`]), the style model
//! ([`Style`] and its enums), and the [`TextMeasure`] seam through which
//! the solver sizes text without depending on any text backend.

pub mod geometry;
pub mod measure;
pub mod style;

pub use geometry::{Rect, Sides, Size};
pub use measure::TextMeasure;
pub use style::{
    AUTO, AlignItems, Direction, JustifyContent, NodeKind, Style, TextStyle, UNBOUNDED,
    VisualStyle,
};
