use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use vello_cpu::kurbo::Shape;

use crate::assets::cache::AssetCache;
use crate::assets::decode::DecodedImage;
use crate::assets::media::{VideoSourceInfo, decode_video_frame_rgba8};
use crate::compose::plan::{
    BackgroundDraw, DrawCommand, FramePlan, TextAlign, TextDraw, TextPaint,
};
use crate::foundation::core::{Affine, Rect, Rgba8};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::foundation::math::{lerp_u8, premultiply_rgba8_in_place};
use crate::render::backend::FrameRGBA;
use crate::text::engine::{TextBrushRgba8, TextLayoutEngine};
use crate::timeline::model::{MediaKind, MediaRef};

const GRADIENT_CACHE_LIMIT: usize = 256;
const DEFAULT_VIDEO_CACHE_CAPACITY: usize = 64;

/// Options for [`CpuRenderer`].
#[derive(Clone, Copy, Debug)]
pub struct CpuRendererOpts {
    /// Decoded video frames kept per clip.
    pub video_cache_capacity: usize,
}

impl Default for CpuRendererOpts {
    fn default() -> Self {
        Self {
            video_cache_capacity: DEFAULT_VIDEO_CACHE_CAPACITY,
        }
    }
}

#[derive(Clone)]
struct ImagePaint {
    source: Arc<DecodedImage>,
    paint: vello_cpu::Image,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct GradientKey {
    start: [u8; 4],
    end: [u8; 4],
    w: u32,
}

struct VideoFrameDecoder {
    info: Arc<VideoSourceInfo>,
    frame_cache: HashMap<u64, vello_cpu::Image>,
    lru: VecDeque<u64>,
    capacity: usize,
}

impl VideoFrameDecoder {
    fn new(info: Arc<VideoSourceInfo>, capacity: usize) -> Self {
        Self {
            info,
            frame_cache: HashMap::new(),
            lru: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn decode_at(&mut self, source_time_s: f64) -> LyrisyncResult<vello_cpu::Image> {
        let key = self.key_for_time(source_time_s);
        if let Some(img) = self.frame_cache.get(&key).cloned() {
            self.touch(key);
            return Ok(img);
        }

        let mut rgba = decode_video_frame_rgba8(&self.info, source_time_s)?;
        premultiply_rgba8_in_place(&mut rgba);
        let image = rgba_premul_to_image(&rgba, self.info.width, self.info.height)?;
        self.insert_frame(key, image.clone());
        Ok(image)
    }

    // Frames are keyed to the clip's own frame grid so nearby times share a decode.
    fn key_for_time(&self, source_time_s: f64) -> u64 {
        let fps = self.info.source_fps();
        let rate = if fps > 0.0 { fps } else { 1000.0 };
        (source_time_s.max(0.0) * rate).floor() as u64
    }

    fn insert_frame(&mut self, key: u64, image: vello_cpu::Image) {
        self.frame_cache.insert(key, image);
        self.touch(key);
        while self.lru.len() > self.capacity {
            if let Some(old) = self.lru.pop_front() {
                self.frame_cache.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.lru.iter().position(|x| *x == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }
}

/// Rasterizes [`FramePlan`]s with `vello_cpu`.
///
/// Media comes from the session [`AssetCache`]; anything not ready is skipped, leaving the
/// plan's black clear visible. Text is shaped by the session [`TextLayoutEngine`] and skipped
/// when no font is registered.
pub struct CpuRenderer {
    opts: CpuRendererOpts,
    ctx: Option<vello_cpu::RenderContext>,
    image_paints: HashMap<MediaRef, ImagePaint>,
    video_decoders: HashMap<MediaRef, VideoFrameDecoder>,
    gradient_cache: HashMap<GradientKey, vello_cpu::Image>,
    font: Option<(Arc<Vec<u8>>, vello_cpu::peniko::FontData)>,
}

impl Default for CpuRenderer {
    fn default() -> Self {
        Self::new(CpuRendererOpts::default())
    }
}

impl CpuRenderer {
    /// Create a renderer.
    pub fn new(opts: CpuRendererOpts) -> Self {
        Self {
            opts,
            ctx: None,
            image_paints: HashMap::new(),
            video_decoders: HashMap::new(),
            gradient_cache: HashMap::new(),
            font: None,
        }
    }

    /// Drop every cached paint and video decoder.
    pub fn release(&mut self) {
        self.image_paints.clear();
        self.video_decoders.clear();
        self.gradient_cache.clear();
        self.font = None;
    }

    /// Rasterize `plan` into a premultiplied frame.
    ///
    /// Errors only when the canvas cannot be rasterized at all.
    #[tracing::instrument(level = "debug", skip_all, fields(commands = plan.commands.len()))]
    pub fn render(
        &mut self,
        plan: &FramePlan,
        cache: &AssetCache,
        text: &mut TextLayoutEngine,
    ) -> LyrisyncResult<FrameRGBA> {
        let width: u16 = plan
            .canvas
            .width
            .try_into()
            .map_err(|_| LyrisyncError::render("canvas width exceeds u16"))?;
        let height: u16 = plan
            .canvas
            .height
            .try_into()
            .map_err(|_| LyrisyncError::render("canvas height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(LyrisyncError::render("canvas must be non-empty"));
        }

        self.with_ctx_mut(width, height, |this, ctx| {
            let mut clip_depth = 0usize;
            for cmd in &plan.commands {
                ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
                ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
                match cmd {
                    DrawCommand::Clear { color } => {
                        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                        ctx.set_paint(color_to_cpu(*color));
                        ctx.fill_rect(&rect_to_cpu(plan.canvas.rect()));
                    }
                    DrawCommand::Background(bg) => this.draw_background(ctx, bg, cache),
                    DrawCommand::FillRect { rect, color } => {
                        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                        ctx.set_paint(color_to_cpu(*color));
                        ctx.fill_rect(&rect_to_cpu(*rect));
                    }
                    DrawCommand::Text(draw) => {
                        if let Err(e) = this.draw_text(ctx, draw, text) {
                            tracing::debug!(error = %e, text = %draw.text, "skipping text draw");
                        }
                    }
                    DrawCommand::PushClip { rect } => {
                        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                        ctx.push_clip_layer(&rect_to_cpu(*rect).to_path(0.1));
                        clip_depth += 1;
                    }
                    DrawCommand::PopClip => {
                        if clip_depth > 0 {
                            ctx.pop_layer();
                            clip_depth -= 1;
                        } else {
                            tracing::debug!("unbalanced PopClip ignored");
                        }
                    }
                }
            }
            for _ in 0..clip_depth {
                ctx.pop_layer();
            }

            ctx.flush();
            let mut pixmap = vello_cpu::Pixmap::new(width, height);
            ctx.render_to_pixmap(&mut pixmap);
            Ok(FrameRGBA {
                width: u32::from(width),
                height: u32::from(height),
                data: pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            })
        })
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> LyrisyncResult<R>,
    ) -> LyrisyncResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    fn draw_background(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        bg: &BackgroundDraw,
        cache: &AssetCache,
    ) {
        let paint = match bg.kind {
            MediaKind::Image => self.image_paint_for(&bg.media, cache),
            MediaKind::Video => self.video_paint_for(&bg.media, bg.source_time, cache),
        };
        let Some((paint, w, h)) = paint else {
            return;
        };
        if w == 0 || h == 0 {
            return;
        }
        let place = Affine::translate((bg.dest.x0, bg.dest.y0))
            * Affine::scale_non_uniform(
                bg.dest.width() / f64::from(w),
                bg.dest.height() / f64::from(h),
            );
        ctx.set_transform(affine_to_cpu(bg.transform * place));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(w),
            f64::from(h),
        ));
    }

    fn image_paint_for(
        &mut self,
        media: &MediaRef,
        cache: &AssetCache,
    ) -> Option<(vello_cpu::Image, u32, u32)> {
        let source = cache.image(media)?;
        if let Some(p) = self.image_paints.get(media)
            && Arc::ptr_eq(&p.source, source)
        {
            return Some((p.paint.clone(), source.width, source.height));
        }
        let paint = match rgba_premul_to_image(&source.rgba8_premul, source.width, source.height)
        {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(media = %media, error = %e, "image not drawable");
                return None;
            }
        };
        self.image_paints.insert(
            media.clone(),
            ImagePaint {
                source: Arc::clone(source),
                paint: paint.clone(),
            },
        );
        Some((paint, source.width, source.height))
    }

    fn video_paint_for(
        &mut self,
        media: &MediaRef,
        source_time: f64,
        cache: &AssetCache,
    ) -> Option<(vello_cpu::Image, u32, u32)> {
        let info = cache.video(media)?;
        let stale = self
            .video_decoders
            .get(media)
            .is_none_or(|d| !Arc::ptr_eq(&d.info, info));
        if stale {
            self.video_decoders.insert(
                media.clone(),
                VideoFrameDecoder::new(Arc::clone(info), self.opts.video_cache_capacity),
            );
        }
        let decoder = self.video_decoders.get_mut(media)?;
        match decoder.decode_at(source_time) {
            Ok(img) => Some((img, info.width, info.height)),
            Err(e) => {
                tracing::debug!(media = %media, error = %e, "video frame unavailable");
                None
            }
        }
    }

    fn font_data(&mut self, engine: &TextLayoutEngine) -> Option<vello_cpu::peniko::FontData> {
        let bytes = engine.font_bytes()?;
        if let Some((cached, font)) = &self.font
            && Arc::ptr_eq(cached, bytes)
        {
            return Some(font.clone());
        }
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
            0,
        );
        self.font = Some((Arc::clone(bytes), font.clone()));
        Some(font)
    }

    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        draw: &TextDraw,
        engine: &mut TextLayoutEngine,
    ) -> LyrisyncResult<()> {
        let opacity = draw.opacity.clamp(0.0, 1.0);
        if draw.text.is_empty() || opacity <= 0.0 {
            return Ok(());
        }
        let Some(font) = self.font_data(engine) else {
            tracing::debug!("no font registered; text not drawn");
            return Ok(());
        };
        let Some(layout) = engine.layout_line(&draw.text, &draw.font, TextBrushRgba8::default())?
        else {
            return Ok(());
        };

        let width = f64::from(layout.full_width());
        let height = f64::from(layout.height());
        let left = match draw.align {
            TextAlign::Center => draw.anchor.x - width / 2.0,
            TextAlign::Left => draw.anchor.x,
        };
        let base = draw.transform * Affine::translate((left, draw.anchor.y - height / 2.0));

        let mut runs: Vec<(f32, Vec<vello_cpu::Glyph>)> = Vec::new();
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run
                    .positioned_glyphs()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();
                runs.push((run.run().font_size(), glyphs));
            }
        }

        if opacity < 1.0 {
            ctx.push_opacity_layer(opacity);
        }

        if let Some(glow) = draw.glow {
            ctx.set_transform(affine_to_cpu(base));
            ctx.set_paint(color_to_cpu(glow.color));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(f64::from(glow.radius) * 2.0));
            for (size, glyphs) in &runs {
                ctx.glyph_run(&font)
                    .font_size(*size)
                    .stroke_glyphs(glyphs.iter().cloned());
            }
        }

        if let Some(shadow) = draw.shadow {
            ctx.set_transform(affine_to_cpu(Affine::translate(shadow.offset) * base));
            ctx.set_paint(color_to_cpu(shadow.color));
            for (size, glyphs) in &runs {
                ctx.glyph_run(&font)
                    .font_size(*size)
                    .fill_glyphs(glyphs.iter().cloned());
            }
        }

        ctx.set_transform(affine_to_cpu(base));
        if let Some(stroke) = draw.stroke {
            ctx.set_paint(color_to_cpu(stroke.color));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(f64::from(stroke.width)));
            for (size, glyphs) in &runs {
                ctx.glyph_run(&font)
                    .font_size(*size)
                    .stroke_glyphs(glyphs.iter().cloned());
            }
        }

        if let Some(fill) = draw.fill {
            match fill {
                TextPaint::Solid { color } => ctx.set_paint(color_to_cpu(color)),
                TextPaint::HorizontalGradient { start, end } => {
                    let w = width.ceil().max(1.0) as u32;
                    let img = self.gradient_paint(start, end, w)?;
                    ctx.set_paint(img);
                }
            }
            for (size, glyphs) in &runs {
                ctx.glyph_run(&font)
                    .font_size(*size)
                    .fill_glyphs(glyphs.iter().cloned());
            }
        }

        if opacity < 1.0 {
            ctx.pop_layer();
        }
        Ok(())
    }

    fn gradient_paint(
        &mut self,
        start: Rgba8,
        end: Rgba8,
        w: u32,
    ) -> LyrisyncResult<vello_cpu::Image> {
        let key = GradientKey {
            start: [start.r, start.g, start.b, start.a],
            end: [end.r, end.g, end.b, end.a],
            w,
        };
        if let Some(img) = self.gradient_cache.get(&key).cloned() {
            return Ok(img);
        }
        let mut bytes = vec![0u8; (w as usize).saturating_mul(4)];
        let w1 = (w.max(1) - 1) as f32;
        for (x, px) in bytes.chunks_exact_mut(4).enumerate() {
            let t = if w1 <= 0.0 { 0.0 } else { (x as f32) / w1 };
            px.copy_from_slice(&[
                lerp_u8(start.r, end.r, t),
                lerp_u8(start.g, end.g, t),
                lerp_u8(start.b, end.b, t),
                lerp_u8(start.a, end.a, t),
            ]);
        }
        premultiply_rgba8_in_place(&mut bytes);
        let img = rgba_premul_to_image(&bytes, w, 1)?;
        if self.gradient_cache.len() >= GRADIENT_CACHE_LIMIT {
            self.gradient_cache.clear();
        }
        self.gradient_cache.insert(key, img.clone());
        Ok(img)
    }
}

impl std::fmt::Debug for CpuRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuRenderer")
            .field("opts", &self.opts)
            .field("images", &self.image_paints.len())
            .field("videos", &self.video_decoders.len())
            .finish()
    }
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> LyrisyncResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| LyrisyncError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| LyrisyncError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(LyrisyncError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn rgba_premul_to_image(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> LyrisyncResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
