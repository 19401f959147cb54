use rand::Rng;

use crate::animation::style::{
    AnimationStyle, StyleTuning, intro_alpha, is_intro, ken_burns_scale,
};
use crate::assets::cache::AssetCache;
use crate::compose::plan::{
    BackgroundDraw, DrawCommand, FramePlan, RenderState, StrokeStyle, TextDraw, TextPaint,
};
use crate::compose::styles::{StyleFrame, place_lines, render_style};
use crate::compose::typography::Typography;
use crate::foundation::core::{Affine, Canvas, Rect, Rgba8};
use crate::scene::project::Project;
use crate::text::measure::{FontSpec, MeasureText};
use crate::text::wrap::wrap_text;
use crate::timeline::index::{ActiveEntries, TimelineCursor};
use crate::timeline::model::{MediaKind, Timeline, VisualAsset};

/// Turns a playback time into a [`FramePlan`].
///
/// Holds only per-session configuration and a scan cursor; all media state is read from the
/// [`AssetCache`] passed to [`Compositor::compute_frame`].
#[derive(Clone, Debug)]
pub struct Compositor {
    canvas: Canvas,
    style: AnimationStyle,
    tuning: StyleTuning,
    typography: Typography,
    cursor: TimelineCursor,
}

impl Compositor {
    /// Create a compositor for a fixed canvas and style.
    pub fn new(
        canvas: Canvas,
        style: AnimationStyle,
        tuning: StyleTuning,
        typography: Typography,
    ) -> Self {
        Self {
            canvas,
            style,
            tuning,
            typography,
            cursor: TimelineCursor::new(),
        }
    }

    /// Create a compositor from a project's framing, style and tuning.
    pub fn from_project(project: &Project) -> Self {
        Self::new(
            project.canvas(),
            project.style,
            project.tuning.clone(),
            project.typography.clone(),
        )
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Selected animation style.
    pub fn style(&self) -> AnimationStyle {
        self.style
    }

    /// Feel constants in use.
    pub fn tuning(&self) -> &StyleTuning {
        &self.tuning
    }

    /// Resolve the active asset and segment at `t`.
    pub fn resolve(&mut self, timeline: &Timeline, t: f64) -> ActiveEntries {
        self.cursor.resolve(timeline, t)
    }

    /// Forget the scan cursor, e.g. after a seek.
    pub fn reset(&mut self) {
        self.cursor.reset();
    }

    /// Build the draw plan for playback time `t`.
    ///
    /// Never fails: unready media draws as black and text that cannot be measured still gets
    /// an estimated layout.
    pub fn compute_frame(
        &mut self,
        t: f64,
        timeline: &Timeline,
        title: &str,
        cache: &AssetCache,
        measure: &mut dyn MeasureText,
        rng: &mut impl Rng,
    ) -> FramePlan {
        let active = self.resolve(timeline, t);
        let mut state = RenderState {
            active_segment: active.segment,
            active_asset: active.asset,
            intro: false,
        };
        let mut commands = vec![DrawCommand::Clear {
            color: Rgba8::BLACK,
        }];

        if let Some(bg) = active
            .asset
            .and_then(|i| self.background(&timeline.assets()[i], t, cache))
        {
            commands.push(DrawCommand::Background(bg));
        }

        commands.push(DrawCommand::FillRect {
            rect: self.canvas.rect(),
            color: Rgba8::BLACK.with_opacity(self.tuning.dim_opacity),
        });

        let first_start = timeline.first_lyric_start();
        if is_intro(t, first_start, &self.tuning) {
            state.intro = true;
            if let Some(first) = first_start {
                self.intro_title(t, first, title, measure, &mut commands);
            }
        } else if let Some(i) = active.segment {
            let seg = &timeline.segments()[i];
            let font = self.typography.lyric_font(self.canvas);
            let lines = self.wrap(&seg.text, &font, measure);
            let placed = place_lines(
                lines,
                self.canvas.center(),
                f64::from(font.line_height(self.typography.line_height)),
                &font,
                measure,
            );
            let frame = StyleFrame {
                lines: &placed,
                font,
                elapsed: t - seg.start_time,
                duration: seg.duration(),
                t,
                canvas: self.canvas,
                tuning: &self.tuning,
                typography: &self.typography,
            };
            render_style(self.style, &frame, measure, rng, &mut commands);
        }

        FramePlan {
            canvas: self.canvas,
            state,
            commands,
        }
    }

    fn background(
        &self,
        asset: &VisualAsset,
        t: f64,
        cache: &AssetCache,
    ) -> Option<BackgroundDraw> {
        let entry = cache.get(&asset.media).filter(|e| e.is_ready());
        let Some((w, h)) = entry.and_then(|e| e.intrinsic_size()) else {
            tracing::debug!(media = %asset.media, "background not ready; drawing solid fill");
            return None;
        };
        let dest = cover_fit(self.canvas, w, h)?;
        let active_for = t - asset.time_index;
        let (transform, source_time) = match asset.kind {
            MediaKind::Image => (
                scale_about_center(self.canvas, ken_burns_scale(active_for, &self.tuning)),
                0.0,
            ),
            MediaKind::Video => (
                Affine::IDENTITY,
                cache
                    .video(&asset.media)
                    .map_or(0.0, |v| v.loop_time(active_for)),
            ),
        };
        Some(BackgroundDraw {
            media: asset.media.clone(),
            kind: asset.kind,
            dest,
            transform,
            source_time,
        })
    }

    fn intro_title(
        &self,
        t: f64,
        first_start: f64,
        title: &str,
        measure: &mut dyn MeasureText,
        out: &mut Vec<DrawCommand>,
    ) {
        if title.trim().is_empty() {
            return;
        }
        let font = self.typography.title_font(self.canvas);
        let lines = self.wrap(title, &font, measure);
        let placed = place_lines(
            lines,
            self.canvas.center(),
            f64::from(font.line_height(self.typography.line_height)),
            &font,
            measure,
        );
        let alpha = intro_alpha(t, first_start, &self.tuning) as f32;
        for line in &placed {
            let mut draw = TextDraw::plain(line.text.clone(), font, line.center, line.width);
            draw.fill = Some(TextPaint::HorizontalGradient {
                start: self.typography.gradient_start,
                end: self.typography.gradient_end,
            });
            draw.stroke = Some(StrokeStyle {
                color: self.typography.stroke_color,
                width: self.typography.stroke_width,
            });
            draw.opacity = alpha;
            out.push(DrawCommand::Text(draw));
        }
    }

    fn wrap(&self, text: &str, font: &FontSpec, measure: &mut dyn MeasureText) -> Vec<String> {
        wrap_text(text, self.typography.max_width(self.canvas), |s| {
            measure.measure(s, font)
        })
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect()
    }
}

/// Destination rectangle that covers `canvas` with a `w`x`h` source, cropping the overflow.
///
/// Returns `None` for empty sources.
pub fn cover_fit(canvas: Canvas, w: u32, h: u32) -> Option<Rect> {
    if w == 0 || h == 0 {
        return None;
    }
    let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));
    let (sw, sh) = (f64::from(w), f64::from(h));
    if sw / sh > canvas.aspect() {
        let dw = sw * ch / sh;
        let x = (cw - dw) / 2.0;
        Some(Rect::new(x, 0.0, x + dw, ch))
    } else {
        let dh = sh * cw / sw;
        let y = (ch - dh) / 2.0;
        Some(Rect::new(0.0, y, cw, y + dh))
    }
}

/// Uniform scale pivoted at the canvas center.
pub fn scale_about_center(canvas: Canvas, scale: f64) -> Affine {
    let c = canvas.center().to_vec2();
    Affine::translate(c) * Affine::scale(scale) * Affine::translate(-c)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/compositor.rs"]
mod tests;
