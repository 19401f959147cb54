use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Rgba8};
use crate::text::measure::FontSpec;

/// Font sizing and color choices for lyric and title text.
///
/// Sizes are fractions of the shorter canvas side so wide and tall framings get the same text
/// scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    /// Lyric font size as a fraction of the shorter canvas side.
    pub lyric_size: f32,
    /// Lyric font weight.
    pub lyric_weight: f32,
    /// Title font size as a fraction of the shorter canvas side.
    pub title_size: f32,
    /// Title font weight.
    pub title_weight: f32,
    /// Maximum line width as a fraction of the canvas width.
    pub max_line_width: f32,
    /// Line advance as a multiple of the font size.
    pub line_height: f32,
    /// Solid text fill.
    pub text_color: Rgba8,
    /// Left stop of the two-color gradient fill.
    pub gradient_start: Rgba8,
    /// Right stop of the two-color gradient fill.
    pub gradient_end: Rgba8,
    /// Outline color for stroked text.
    pub stroke_color: Rgba8,
    /// Outline width in pixels.
    pub stroke_width: f32,
    /// Hard drop shadow color.
    pub shadow_color: Rgba8,
    /// Drop shadow offset in pixels along both axes.
    pub shadow_offset: f64,
    /// Glow halo color.
    pub glow_color: Rgba8,
    /// Glow halo radius in pixels.
    pub glow_radius: f32,
    /// Karaoke outline (unfilled) color.
    pub outline_color: Rgba8,
    /// Red glitch pass tint.
    pub glitch_red: Rgba8,
    /// Cyan glitch pass tint.
    pub glitch_cyan: Rgba8,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            lyric_size: 0.08,
            lyric_weight: 800.0,
            title_size: 0.11,
            title_weight: 900.0,
            max_line_width: 0.8,
            line_height: 1.2,
            text_color: Rgba8::WHITE,
            gradient_start: Rgba8::rgb(0xf4, 0x72, 0xb6),
            gradient_end: Rgba8::rgb(0x22, 0xd3, 0xee),
            stroke_color: Rgba8::rgba(0, 0, 0, 0xcc),
            stroke_width: 4.0,
            shadow_color: Rgba8::BLACK,
            shadow_offset: 6.0,
            glow_color: Rgba8::rgba(0x22, 0xd3, 0xee, 0x99),
            glow_radius: 10.0,
            outline_color: Rgba8::rgba(255, 255, 255, 0x4d),
            glitch_red: Rgba8::rgba(255, 0, 0x40, 0xcc),
            glitch_cyan: Rgba8::rgba(0, 255, 255, 0xcc),
        }
    }
}

impl Typography {
    /// Font used for lyric lines on `canvas`.
    pub fn lyric_font(&self, canvas: Canvas) -> FontSpec {
        FontSpec::new(
            (canvas.short_side() as f32 * self.lyric_size).max(1.0),
            self.lyric_weight,
        )
    }

    /// Font used for the intro title on `canvas`.
    pub fn title_font(&self, canvas: Canvas) -> FontSpec {
        FontSpec::new(
            (canvas.short_side() as f32 * self.title_size).max(1.0),
            self.title_weight,
        )
    }

    /// Widest a wrapped line may measure on `canvas`.
    pub fn max_width(&self, canvas: Canvas) -> f32 {
        canvas.width as f32 * self.max_line_width
    }
}
