use rand::Rng;

use crate::animation::style::{
    AnimationStyle, StyleTuning, glitch_jitter, karaoke_fill, signal_offset, snap_scale,
    standard_reveal,
};
use crate::compose::plan::{
    DrawCommand, GlowStyle, ShadowStyle, StrokeStyle, TextAlign, TextDraw, TextPaint,
};
use crate::compose::typography::Typography;
use crate::foundation::core::{Affine, Canvas, Point, Rect, Vec2};
use crate::text::measure::{FontSpec, MeasureText};

/// One wrapped line positioned in a vertically centered block.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLine {
    /// Line text.
    pub text: String,
    /// Center of the line box in canvas pixels.
    pub center: Point,
    /// Measured width.
    pub width: f32,
}

/// Inputs shared by every style renderer for one frame.
#[derive(Clone, Copy, Debug)]
pub struct StyleFrame<'a> {
    /// Wrapped, positioned lines.
    pub lines: &'a [PlacedLine],
    /// Font the lines were measured with.
    pub font: FontSpec,
    /// Seconds since the segment started.
    pub elapsed: f64,
    /// Segment duration in seconds; may be zero or negative.
    pub duration: f64,
    /// Global playback time.
    pub t: f64,
    /// Output canvas.
    pub canvas: Canvas,
    /// Feel constants.
    pub tuning: &'a StyleTuning,
    /// Colors and sizes.
    pub typography: &'a Typography,
}

impl StyleFrame<'_> {
    fn line_height(&self) -> f64 {
        f64::from(self.font.line_height(self.typography.line_height))
    }

    fn text(&self, line: &PlacedLine) -> TextDraw {
        let mut draw = TextDraw::plain(line.text.clone(), self.font, line.center, line.width);
        draw.fill = Some(TextPaint::Solid {
            color: self.typography.text_color,
        });
        draw
    }

    fn gradient(&self) -> TextPaint {
        TextPaint::HorizontalGradient {
            start: self.typography.gradient_start,
            end: self.typography.gradient_end,
        }
    }
}

/// Lay out `lines` as a block centered on `center`, one line-height apart.
pub fn place_lines(
    lines: Vec<String>,
    center: Point,
    line_height: f64,
    font: &FontSpec,
    measure: &mut dyn MeasureText,
) -> Vec<PlacedLine> {
    let n = lines.len() as f64;
    let top = center.y - n * line_height / 2.0;
    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let width = measure.measure(&text, font);
            PlacedLine {
                text,
                center: Point::new(center.x, top + line_height * (i as f64 + 0.5)),
                width,
            }
        })
        .collect()
}

/// Emit draw commands for the active segment in `style`.
pub fn render_style(
    style: AnimationStyle,
    frame: &StyleFrame<'_>,
    measure: &mut dyn MeasureText,
    rng: &mut impl Rng,
    out: &mut Vec<DrawCommand>,
) {
    match style {
        AnimationStyle::Standard => render_standard(frame, out),
        AnimationStyle::Snap => render_snap(frame, out),
        AnimationStyle::Karaoke => render_karaoke(frame, out),
        AnimationStyle::Signal => render_signal(frame, measure, out),
        AnimationStyle::Glitch => render_glitch(frame, rng, out),
    }
}

/// Fade in while sliding up from below.
pub fn render_standard(frame: &StyleFrame<'_>, out: &mut Vec<DrawCommand>) {
    let (alpha, drop) = standard_reveal(frame.elapsed, frame.tuning);
    for line in frame.lines {
        let mut draw = frame.text(line);
        draw.anchor.y += drop;
        draw.opacity = alpha as f32;
        out.push(DrawCommand::Text(draw));
    }
}

/// Punch in from a large scale about the canvas center.
pub fn render_snap(frame: &StyleFrame<'_>, out: &mut Vec<DrawCommand>) {
    let scale = snap_scale(frame.elapsed, frame.tuning);
    let pivot = frame.canvas.center().to_vec2();
    let transform = Affine::translate(pivot) * Affine::scale(scale) * Affine::translate(-pivot);
    let offset = frame.typography.shadow_offset;
    for line in frame.lines {
        let mut draw = frame.text(line);
        draw.fill = Some(frame.gradient());
        draw.shadow = Some(ShadowStyle {
            color: frame.typography.shadow_color,
            offset: Vec2::new(offset, offset),
        });
        draw.transform = transform;
        out.push(DrawCommand::Text(draw));
    }
}

/// Outline, then a filled copy clipped to a left-anchored wipe.
pub fn render_karaoke(frame: &StyleFrame<'_>, out: &mut Vec<DrawCommand>) {
    let fill = karaoke_fill(frame.elapsed, frame.duration, frame.tuning);
    let half_h = frame.line_height() / 2.0 + f64::from(frame.typography.stroke_width);
    for line in frame.lines {
        let mut outline = frame.text(line);
        outline.fill = None;
        outline.stroke = Some(StrokeStyle {
            color: frame.typography.outline_color,
            width: frame.typography.stroke_width,
        });
        let left = outline.left();
        out.push(DrawCommand::Text(outline));

        if fill <= 0.0 {
            continue;
        }
        let right = left + f64::from(line.width) * fill;
        out.push(DrawCommand::PushClip {
            rect: Rect::new(left, line.center.y - half_h, right, line.center.y + half_h),
        });
        out.push(DrawCommand::Text(frame.text(line)));
        out.push(DrawCommand::PopClip);
    }
}

/// Per-character sine wave with a glow.
pub fn render_signal(
    frame: &StyleFrame<'_>,
    measure: &mut dyn MeasureText,
    out: &mut Vec<DrawCommand>,
) {
    let glow = GlowStyle {
        color: frame.typography.glow_color,
        radius: frame.typography.glow_radius,
    };
    for line in frame.lines {
        let left = line.center.x - f64::from(line.width) / 2.0;
        let mut prefix = String::with_capacity(line.text.len());
        for (i, ch) in line.text.chars().enumerate() {
            let x = left + f64::from(measure.measure(&prefix, &frame.font));
            prefix.push(ch);
            if ch.is_whitespace() {
                continue;
            }
            let glyph = ch.to_string();
            let width = measure.measure(&glyph, &frame.font);
            let y = line.center.y + signal_offset(frame.t, i, frame.tuning);
            let mut draw = TextDraw::plain(glyph, frame.font, Point::new(x, y), width);
            draw.align = TextAlign::Left;
            draw.fill = Some(TextPaint::Solid {
                color: frame.typography.text_color,
            });
            draw.glow = Some(glow);
            out.push(DrawCommand::Text(draw));
        }
    }
}

/// Red and cyan split passes under a white pass, with occasional whole-block jitter.
pub fn render_glitch(frame: &StyleFrame<'_>, rng: &mut impl Rng, out: &mut Vec<DrawCommand>) {
    let jitter = glitch_jitter(rng, frame.tuning);
    let split = frame.tuning.glitch_split_px;
    let passes = [
        (Vec2::new(split, 0.0), frame.typography.glitch_red),
        (Vec2::new(-split, 0.0), frame.typography.glitch_cyan),
        (Vec2::ZERO, frame.typography.text_color),
    ];
    for (shift, color) in passes {
        for line in frame.lines {
            let mut draw = frame.text(line);
            draw.anchor += jitter + shift;
            draw.fill = Some(TextPaint::Solid { color });
            out.push(DrawCommand::Text(draw));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/styles.rs"]
mod tests;
