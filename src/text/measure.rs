use serde::{Deserialize, Serialize};

/// Average advance of one character relative to the font size, used when no font is loaded.
const FALLBACK_ADVANCE_FACTOR: f32 = 0.55;

/// Font size and weight used to measure and draw a run of text.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// Font size in pixels.
    pub size_px: f32,
    /// CSS-style weight (100..=900).
    pub weight: f32,
}

impl FontSpec {
    /// Create a font spec.
    pub fn new(size_px: f32, weight: f32) -> Self {
        Self { size_px, weight }
    }

    /// Line advance for this font at the given line-height multiplier.
    pub fn line_height(&self, multiplier: f32) -> f32 {
        self.size_px * multiplier
    }
}

/// Measures the rendered width of a single line of text.
///
/// Implementations must reflect the font, size and weight they will draw with.
pub trait MeasureText {
    /// Width of `text` in pixels when drawn with `font`.
    fn measure(&mut self, text: &str, font: &FontSpec) -> f32;
}

/// Width estimate assuming every character advances by a fixed fraction of the font size.
pub fn estimate_text_width(text: &str, font: &FontSpec) -> f32 {
    text.chars().count() as f32 * font.size_px * FALLBACK_ADVANCE_FACTOR
}

/// Fixed-advance measurer. Deterministic, font-free.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedAdvance;

impl MeasureText for FixedAdvance {
    fn measure(&mut self, text: &str, font: &FontSpec) -> f32 {
        estimate_text_width(text, font)
    }
}
