use serde::Serialize;

use crate::foundation::core::{Affine, Canvas, Point, Rect, Rgba8, Vec2};
use crate::text::measure::FontSpec;
use crate::timeline::model::{MediaKind, MediaRef};

/// Per-frame selection state. Recomputed every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderState {
    /// Index of the active lyric segment.
    pub active_segment: Option<usize>,
    /// Index of the active visual asset.
    pub active_asset: Option<usize>,
    /// Whether the intro title is shown instead of lyrics.
    pub intro: bool,
}

/// Everything needed to paint one frame, in paint order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FramePlan {
    /// Target canvas.
    pub canvas: Canvas,
    /// Selection state the commands were derived from.
    pub state: RenderState,
    /// Draw commands, back to front.
    pub commands: Vec<DrawCommand>,
}

impl FramePlan {
    /// Text commands in paint order.
    pub fn texts(&self) -> impl Iterator<Item = &TextDraw> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text(t) => Some(t),
            _ => None,
        })
    }

    /// The background command, if a visual was drawable.
    pub fn background(&self) -> Option<&BackgroundDraw> {
        self.commands.iter().find_map(|c| match c {
            DrawCommand::Background(b) => Some(b),
            _ => None,
        })
    }
}

/// One drawing operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Fill the whole canvas with an opaque color.
    Clear {
        /// Fill color.
        color: Rgba8,
    },
    /// Draw a background visual.
    Background(BackgroundDraw),
    /// Fill a rectangle in canvas space.
    FillRect {
        /// Rectangle in canvas pixels.
        rect: Rect,
        /// Fill color; alpha gives the layer opacity.
        color: Rgba8,
    },
    /// Draw one line (or glyph cluster) of text.
    Text(TextDraw),
    /// Restrict following commands to `rect` until the matching [`DrawCommand::PopClip`].
    PushClip {
        /// Clip rectangle in canvas pixels.
        rect: Rect,
    },
    /// End the innermost clip.
    PopClip,
}

/// A background visual placed with a cover fit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BackgroundDraw {
    /// Media to draw.
    pub media: MediaRef,
    /// Image or video.
    pub kind: MediaKind,
    /// Cover-fit destination before `transform`; may extend past the canvas.
    pub dest: Rect,
    /// Extra canvas-space transform (Ken Burns zoom for images).
    pub transform: Affine,
    /// Source time for video frames, already looped.
    pub source_time: f64,
}

/// Horizontal placement of text relative to its anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    /// Anchor is the horizontal center of the text.
    #[default]
    Center,
    /// Anchor is the left edge of the text.
    Left,
}

/// Text fill.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextPaint {
    /// Single color.
    Solid {
        /// Fill color.
        color: Rgba8,
    },
    /// Left-to-right two-color gradient spanning the text width.
    HorizontalGradient {
        /// Left color.
        start: Rgba8,
        /// Right color.
        end: Rgba8,
    },
}

/// Outline around glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StrokeStyle {
    /// Outline color.
    pub color: Rgba8,
    /// Outline width in pixels.
    pub width: f32,
}

/// Hard, unblurred drop shadow.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ShadowStyle {
    /// Shadow color.
    pub color: Rgba8,
    /// Offset from the text.
    pub offset: Vec2,
}

/// Soft halo behind glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GlowStyle {
    /// Halo color.
    pub color: Rgba8,
    /// Halo radius in pixels.
    pub radius: f32,
}

/// A run of text with its styling.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextDraw {
    /// Text to draw on a single line.
    pub text: String,
    /// Font size and weight.
    pub font: FontSpec,
    /// Anchor in canvas pixels; vertically the middle of the line.
    pub anchor: Point,
    /// How the anchor relates to the text horizontally.
    pub align: TextAlign,
    /// Measured width of `text`.
    pub width: f32,
    /// Fill, or `None` for outline-only text.
    pub fill: Option<TextPaint>,
    /// Optional outline.
    pub stroke: Option<StrokeStyle>,
    /// Optional drop shadow.
    pub shadow: Option<ShadowStyle>,
    /// Optional glow.
    pub glow: Option<GlowStyle>,
    /// Opacity of the whole text, in `[0, 1]`.
    pub opacity: f32,
    /// Canvas-space transform applied after placement.
    pub transform: Affine,
}

impl TextDraw {
    /// Solid, centered text with no effects.
    pub fn plain(text: impl Into<String>, font: FontSpec, anchor: Point, width: f32) -> Self {
        Self {
            text: text.into(),
            font,
            anchor,
            align: TextAlign::Center,
            width,
            fill: Some(TextPaint::Solid {
                color: Rgba8::WHITE,
            }),
            stroke: None,
            shadow: None,
            glow: None,
            opacity: 1.0,
            transform: Affine::IDENTITY,
        }
    }

    /// Left edge of the text box before `transform`.
    pub fn left(&self) -> f64 {
        match self.align {
            TextAlign::Center => self.anchor.x - f64::from(self.width) / 2.0,
            TextAlign::Left => self.anchor.x,
        }
    }
}
