#![forbid(unsafe_code)]

//! The style model.
//!
//! A [`Style`] is a plain value: flexbox fields that drive layout, plus
//! visual and text fields the engine passes through untouched. Layout
//! code compares styles with [`Style::layout_eq`] to decide whether an
//! edit needs a re-layout at all; changes confined to [`VisualStyle`]
//! (and to text color or font name) never do.
//!
//! # Size sentinels
//!
//! Widths and heights use two sentinel values:
//! - [`AUTO`] (`-1.0`) means "content-sized",
//! - [`UNBOUNDED`] (`+inf`) means "no upper bound".
//!
//! `0.0` is a legal minimum everywhere.

use serde::{Deserialize, Serialize};

use crate::geometry::Sides;

/// Content-sized sentinel for `width`/`height`.
pub const AUTO: f32 = -1.0;

/// No-upper-bound sentinel for `max_width`/`max_height` (and available space).
pub const UNBOUNDED: f32 = f32::INFINITY;

/// Main-axis orientation of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Left to right.
    #[default]
    Row,
    /// Top to bottom.
    Column,
    /// Right to left.
    RowReverse,
    /// Bottom to top.
    ColumnReverse,
}

impl Direction {
    /// Whether the main axis is horizontal.
    #[inline]
    pub const fn is_row(self) -> bool {
        matches!(self, Direction::Row | Direction::RowReverse)
    }

    /// Whether children are placed in reverse insertion order.
    #[inline]
    pub const fn is_reverse(self) -> bool {
        matches!(self, Direction::RowReverse | Direction::ColumnReverse)
    }
}

/// Distribution of free space along the main axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JustifyContent {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

/// Alignment of children on the cross axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlignItems {
    Start,
    Center,
    End,
    /// Auto-sized children fill the container's cross axis. Children with
    /// an explicit cross size keep it.
    #[default]
    Stretch,
}

/// What a node is, for intrinsic sizing. Tree shape and flex behavior are
/// identical across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    /// Sizes to its children.
    #[default]
    Container,
    /// Sizes via the installed text measurer.
    Text,
    /// Sizes from explicit style dimensions (auto resolves to zero).
    Image,
    /// As `Image`; reserved for embedder-defined content.
    Custom,
}

/// Fields the layout engine never interprets; handed through to the
/// renderer verbatim. Editing these does not trigger a re-layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualStyle {
    /// Packed RGBA background color.
    pub background: u32,
    /// Packed RGBA border color.
    pub border_color: u32,
    pub border_width: f32,
    pub corner_radius: f32,
}

/// Text content and typography for [`NodeKind::Text`] nodes.
///
/// `text` and `font_size` feed the measurer and therefore affect layout;
/// `font_name` and `color` are passed through.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub text: String,
    pub font_name: Option<String>,
    pub font_size: f32,
    /// Packed RGBA text color.
    pub color: u32,
}

/// The full per-node style.
///
/// Built with the fluent setters:
///
/// ```
/// use lithe_core::{Direction, Style};
///
/// let style = Style::new()
///     .direction(Direction::Column)
///     .gap(8.0)
///     .width(320.0);
/// assert_eq!(style.gap, 8.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub direction: Direction,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    /// [`AUTO`] for content-sized, otherwise a fixed content-box extent.
    pub width: f32,
    pub height: f32,
    pub min_width: f32,
    pub min_height: f32,
    /// [`UNBOUNDED`] for no limit.
    pub max_width: f32,
    pub max_height: f32,
    pub gap: f32,
    pub padding: Sides,
    pub margin: Sides,
    pub visual: VisualStyle,
    pub text: Option<TextStyle>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            justify_content: JustifyContent::default(),
            align_items: AlignItems::default(),
            flex_grow: 0.0,
            flex_shrink: 1.0,
            width: AUTO,
            height: AUTO,
            min_width: 0.0,
            min_height: 0.0,
            max_width: UNBOUNDED,
            max_height: UNBOUNDED,
            gap: 0.0,
            padding: Sides::ZERO,
            margin: Sides::ZERO,
            visual: VisualStyle::default(),
            text: None,
        }
    }
}

impl Style {
    /// A default (auto-sized row) style.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the main-axis direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set main-axis free-space distribution.
    #[must_use]
    pub fn justify_content(mut self, justify: JustifyContent) -> Self {
        self.justify_content = justify;
        self
    }

    /// Set cross-axis child alignment.
    #[must_use]
    pub fn align_items(mut self, align: AlignItems) -> Self {
        self.align_items = align;
        self
    }

    /// Set the grow factor.
    #[must_use]
    pub fn flex_grow(mut self, grow: f32) -> Self {
        self.flex_grow = grow;
        self
    }

    /// Set the shrink factor.
    #[must_use]
    pub fn flex_shrink(mut self, shrink: f32) -> Self {
        self.flex_shrink = shrink;
        self
    }

    /// Set a fixed content-box width.
    #[must_use]
    pub fn width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Set a fixed content-box height.
    #[must_use]
    pub fn height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    /// Set both minimum extents.
    #[must_use]
    pub fn min_size(mut self, min_width: f32, min_height: f32) -> Self {
        self.min_width = min_width;
        self.min_height = min_height;
        self
    }

    /// Set both maximum extents.
    #[must_use]
    pub fn max_size(mut self, max_width: f32, max_height: f32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    /// Set the inter-child gap.
    #[must_use]
    pub fn gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }

    /// Set the padding.
    #[must_use]
    pub fn padding(mut self, padding: Sides) -> Self {
        self.padding = padding;
        self
    }

    /// Set the margin.
    #[must_use]
    pub fn margin(mut self, margin: Sides) -> Self {
        self.margin = margin;
        self
    }

    /// Set the visual pass-through fields.
    #[must_use]
    pub fn visual(mut self, visual: VisualStyle) -> Self {
        self.visual = visual;
        self
    }

    /// Set text content with the given font size.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>, font_size: f32) -> Self {
        self.text = Some(TextStyle {
            text: text.into(),
            font_size,
            ..TextStyle::default()
        });
        self
    }

    /// Set the full text style.
    #[must_use]
    pub fn text_style(mut self, text: TextStyle) -> Self {
        self.text = Some(text);
        self
    }

    /// Whether `self` and `other` differ in any layout-affecting field.
    ///
    /// Layout-affecting means the flex fields, sizes, gap, padding,
    /// margin, and (for text) the content string, font size, or the
    /// presence of text at all. Visual fields, text color, and font name
    /// are excluded.
    pub fn layout_eq(&self, other: &Style) -> bool {
        self.direction == other.direction
            && self.justify_content == other.justify_content
            && self.align_items == other.align_items
            && self.flex_grow.to_bits() == other.flex_grow.to_bits()
            && self.flex_shrink.to_bits() == other.flex_shrink.to_bits()
            && self.width.to_bits() == other.width.to_bits()
            && self.height.to_bits() == other.height.to_bits()
            && self.min_width.to_bits() == other.min_width.to_bits()
            && self.min_height.to_bits() == other.min_height.to_bits()
            && self.max_width.to_bits() == other.max_width.to_bits()
            && self.max_height.to_bits() == other.max_height.to_bits()
            && self.gap.to_bits() == other.gap.to_bits()
            && self.padding == other.padding
            && self.margin == other.margin
            && text_layout_eq(self.text.as_ref(), other.text.as_ref())
    }

    /// Clamp out-of-range inputs at set time: negative gap, minimums,
    /// padding, margin, and flex factors all become zero.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.flex_grow = self.flex_grow.max(0.0);
        self.flex_shrink = self.flex_shrink.max(0.0);
        self.min_width = self.min_width.max(0.0);
        self.min_height = self.min_height.max(0.0);
        self.gap = self.gap.max(0.0);
        self.padding = self.padding.sanitized();
        self.margin = self.margin.sanitized();
        if let Some(text) = &mut self.text {
            text.font_size = text.font_size.max(0.0);
        }
        self
    }
}

/// Whether two optional text styles agree on the layout-affecting text
/// fields (content and font size). Color and font name are excluded.
pub fn text_layout_eq(a: Option<&TextStyle>, b: Option<&TextStyle>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.text == b.text && a.font_size.to_bits() == b.font_size.to_bits()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_auto_sized_row() {
        let s = Style::default();
        assert_eq!(s.direction, Direction::Row);
        assert_eq!(s.align_items, AlignItems::Stretch);
        assert_eq!(s.width, AUTO);
        assert_eq!(s.max_width, UNBOUNDED);
        assert_eq!(s.flex_shrink, 1.0);
        assert_eq!(s.flex_grow, 0.0);
    }

    #[test]
    fn visual_edits_are_layout_equal() {
        let a = Style::new().width(100.0);
        let mut b = a.clone();
        b.visual.background = 0xff00_00ff;
        b.visual.corner_radius = 4.0;
        assert!(a.layout_eq(&b));
    }

    #[test]
    fn size_edits_are_not_layout_equal() {
        let a = Style::new().width(100.0);
        let b = a.clone().width(101.0);
        assert!(!a.layout_eq(&b));
    }

    #[test]
    fn text_content_affects_layout_but_color_does_not() {
        let a = Style::new().text("hello", 14.0);
        let mut b = a.clone();
        b.text.as_mut().unwrap().color = 0x1234_5678;
        assert!(a.layout_eq(&b));

        let mut c = a.clone();
        c.text.as_mut().unwrap().text.push('!');
        assert!(!a.layout_eq(&c));

        let mut d = a.clone();
        d.text.as_mut().unwrap().font_size = 15.0;
        assert!(!a.layout_eq(&d));

        // Font swaps are pass-through; the embedder re-measures by
        // touching a layout field if metrics actually changed.
        let mut e = a.clone();
        e.text.as_mut().unwrap().font_name = Some("mono".to_string());
        assert!(a.layout_eq(&e));
    }

    #[test]
    fn sanitized_clamps_negative_inputs() {
        let s = Style::new()
            .gap(-4.0)
            .flex_grow(-1.0)
            .min_size(-10.0, -10.0)
            .padding(Sides::uniform(-2.0))
            .sanitized();
        assert_eq!(s.gap, 0.0);
        assert_eq!(s.flex_grow, 0.0);
        assert_eq!(s.min_width, 0.0);
        assert_eq!(s.padding, Sides::ZERO);
    }

    #[test]
    fn style_round_trips_through_serde() {
        // JSON has no infinity, so a snapshot-friendly style uses
        // finite bounds.
        let s = Style::new()
            .direction(Direction::Column)
            .gap(6.0)
            .max_size(640.0, 480.0)
            .text("label", 12.0);
        let json = serde_json::to_string(&s).unwrap();
        let back: Style = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
