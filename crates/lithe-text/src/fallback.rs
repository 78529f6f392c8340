#![forbid(unsafe_code)]

//! Table-driven fallback measurer.
//!
//! Estimates text extents from a fixed table of per-glyph advances,
//! expressed as fractions of the font size, for the 95 printable ASCII
//! characters. The ratios approximate a common Latin sans face; they are
//! close enough for layout to be usable before a real shaping backend is
//! installed, and deterministic enough to test against.

use lithe_core::{Size, TextMeasure};

/// Line height as a multiple of font size.
const LINE_HEIGHT: f32 = 1.2;

/// Advance ratio for characters outside the table (non-ASCII).
const DEFAULT_ADVANCE: f32 = 0.6;

/// Advance ratios for `' '` (0x20) through `'~'` (0x7E), per font-size unit.
#[rustfmt::skip]
const ADVANCES: [f32; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    0.28, 0.28, 0.36, 0.56, 0.56, 0.89, 0.67, 0.19,
    0.33, 0.33, 0.39, 0.58, 0.28, 0.33, 0.28, 0.28,
    // 0-9
    0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
    // : ; < = > ? @
    0.28, 0.28, 0.58, 0.58, 0.58, 0.56, 1.02,
    // A-Z
    0.67, 0.67, 0.72, 0.72, 0.67, 0.61, 0.78, 0.72, 0.28, 0.50,
    0.67, 0.56, 0.83, 0.72, 0.78, 0.67, 0.78, 0.72, 0.67, 0.61,
    0.72, 0.67, 0.87, 0.67, 0.67, 0.61,
    // [ \ ] ^ _ `
    0.28, 0.28, 0.28, 0.47, 0.56, 0.33,
    // a-z
    0.56, 0.56, 0.50, 0.56, 0.56, 0.28, 0.56, 0.56, 0.22, 0.22,
    0.50, 0.22, 0.83, 0.56, 0.56, 0.56, 0.56, 0.33, 0.50, 0.28,
    0.56, 0.50, 0.72, 0.50, 0.50, 0.50,
    // { | } ~
    0.33, 0.26, 0.33, 0.58,
];

/// Stateless measurer backed by [`ADVANCES`].
///
/// Wrapping is greedy at whitespace boundaries: words are packed onto a
/// line until the next one would overflow `available_width`. A word
/// wider than the whole line occupies its own line and overflows;
/// explicit `'\n'` always breaks. An unbounded width yields the natural
/// single-line extent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackMeasure;

impl FallbackMeasure {
    /// Advance of one character at `font_size`.
    #[inline]
    fn advance(c: char, font_size: f32) -> f32 {
        let ratio = match c {
            ' '..='~' => ADVANCES[c as usize - 0x20],
            // Tabs land on no particular stop; approximate four spaces.
            '\t' => 4.0 * ADVANCES[0],
            c if c.is_control() => 0.0,
            _ => DEFAULT_ADVANCE,
        };
        ratio * font_size
    }

    fn word_width(word: &str, font_size: f32) -> f32 {
        word.chars().map(|c| Self::advance(c, font_size)).sum()
    }
}

impl TextMeasure for FallbackMeasure {
    fn measure(
        &self,
        text: &str,
        _font_name: Option<&str>,
        font_size: f32,
        available_width: f32,
    ) -> Size {
        if text.is_empty() || font_size <= 0.0 {
            return Size::ZERO;
        }

        let space = Self::advance(' ', font_size);
        let mut lines = 0u32;
        let mut max_width = 0.0f32;

        for paragraph in text.split('\n') {
            let mut line_width = 0.0f32;
            let mut line_has_words = false;
            for word in paragraph.split_whitespace() {
                let word_width = Self::word_width(word, font_size);
                let candidate = if line_has_words {
                    line_width + space + word_width
                } else {
                    word_width
                };
                if candidate <= available_width || !line_has_words {
                    // Fits, or is an oversized word that gets the line
                    // to itself anyway.
                    line_width = candidate;
                    line_has_words = true;
                } else {
                    lines += 1;
                    max_width = max_width.max(line_width);
                    line_width = word_width;
                }
            }
            lines += 1;
            max_width = max_width.max(line_width);
        }

        if max_width > available_width && available_width.is_finite() {
            tracing::debug!(
                width = max_width,
                available_width,
                "text wider than its box"
            );
        }

        Size::new(max_width, lines as f32 * font_size * LINE_HEIGHT)
    }
}
