use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::text::measure::{FontSpec, MeasureText, estimate_text_width};

const MEASURE_CACHE_LIMIT: usize = 4096;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    /// Red channel.
    pub(crate) r: u8,
    /// Green channel.
    pub(crate) g: u8,
    /// Blue channel.
    pub(crate) b: u8,
    /// Alpha channel.
    pub(crate) a: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MeasureKey {
    text: String,
    size_bits: u32,
    weight_bits: u32,
}

/// Stateful helper for shaping single lines of text with the session font.
///
/// Without a registered font, measurement falls back to a fixed-advance estimate and no glyph
/// layouts are produced.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: Option<String>,
    font_bytes: Option<Arc<Vec<u8>>>,
    measure_cache: HashMap<MeasureKey, f32>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct an engine with no font registered.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            family_name: None,
            font_bytes: None,
            measure_cache: HashMap::new(),
        }
    }

    /// Construct an engine and register `font_bytes` as the session font.
    pub fn with_font_bytes(font_bytes: Vec<u8>) -> LyrisyncResult<Self> {
        let mut engine = Self::new();
        engine.register_font(font_bytes)?;
        Ok(engine)
    }

    /// Register font bytes and make their first family the active one.
    pub fn register_font(&mut self, font_bytes: Vec<u8>) -> LyrisyncResult<()> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            LyrisyncError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| LyrisyncError::validation("registered font family has no name"))?
            .to_string();

        tracing::debug!(family = %family_name, "registered session font");
        self.family_name = Some(family_name);
        self.font_bytes = Some(Arc::new(font_bytes));
        self.measure_cache.clear();
        Ok(())
    }

    /// Family name of the registered font.
    pub fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    /// Raw bytes of the registered font.
    pub fn font_bytes(&self) -> Option<&Arc<Vec<u8>>> {
        self.font_bytes.as_ref()
    }

    /// Shape `text` as a single unbroken line.
    ///
    /// Returns `Ok(None)` when no font is registered.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        font: &FontSpec,
        brush: TextBrushRgba8,
    ) -> LyrisyncResult<Option<parley::Layout<TextBrushRgba8>>> {
        if !font.size_px.is_finite() || font.size_px <= 0.0 {
            return Err(LyrisyncError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        let Some(family_name) = self.family_name.clone() else {
            return Ok(None);
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(font.weight.clamp(1.0, 1000.0)),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(Some(layout))
    }
}

impl MeasureText for TextLayoutEngine {
    fn measure(&mut self, text: &str, font: &FontSpec) -> f32 {
        let key = MeasureKey {
            text: text.to_owned(),
            size_bits: font.size_px.to_bits(),
            weight_bits: font.weight.to_bits(),
        };
        if let Some(w) = self.measure_cache.get(&key) {
            return *w;
        }

        let width = match self.layout_line(text, font, TextBrushRgba8::default()) {
            Ok(Some(layout)) => layout.full_width(),
            Ok(None) => estimate_text_width(text, font),
            Err(e) => {
                tracing::debug!(error = %e, "text measurement fell back to estimate");
                estimate_text_width(text, font)
            }
        };

        if self.measure_cache.len() >= MEASURE_CACHE_LIMIT {
            self.measure_cache.clear();
        }
        self.measure_cache.insert(key, width);
        width
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/engine.rs"]
mod tests;
