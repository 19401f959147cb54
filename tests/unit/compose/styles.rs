use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::foundation::core::Rgba8;
use crate::text::measure::FixedAdvance;

fn font() -> FontSpec {
    FontSpec::new(20.0, 800.0)
}

fn lines(texts: &[&str]) -> Vec<PlacedLine> {
    let font = font();
    place_lines(
        texts.iter().map(|s| s.to_string()).collect(),
        Point::new(960.0, 540.0),
        24.0,
        &font,
        &mut FixedAdvance,
    )
}

fn frame<'a>(
    lines: &'a [PlacedLine],
    elapsed: f64,
    duration: f64,
    tuning: &'a StyleTuning,
    typography: &'a Typography,
) -> StyleFrame<'a> {
    StyleFrame {
        lines,
        font: font(),
        elapsed,
        duration,
        t: 3.0,
        canvas: Canvas {
            width: 1920,
            height: 1080,
        },
        tuning,
        typography,
    }
}

fn texts(out: &[DrawCommand]) -> Vec<&TextDraw> {
    out.iter()
        .filter_map(|c| match c {
            DrawCommand::Text(t) => Some(t),
            _ => None,
        })
        .collect()
}

#[test]
fn place_lines_centers_the_block() {
    let placed = lines(&["one", "two", "three"]);
    assert_eq!(placed.len(), 3);
    assert_eq!(placed[0].center.y, 540.0 - 24.0);
    assert_eq!(placed[1].center.y, 540.0);
    assert_eq!(placed[2].center.y, 540.0 + 24.0);
    assert!(placed.iter().all(|l| l.center.x == 960.0));
    assert_eq!(placed[2].width, 5.0 * 20.0 * 0.55);
}

#[test]
fn standard_fades_and_slides() {
    let (tuning, typo) = (StyleTuning::default(), Typography::default());
    let placed = lines(&["hello"]);

    let mut out = Vec::new();
    render_standard(&frame(&placed, 0.0, 2.0, &tuning, &typo), &mut out);
    let t = texts(&out);
    assert_eq!(t.len(), 1);
    assert_eq!(t[0].opacity, 0.0);
    assert_eq!(t[0].anchor.y, 540.0 + 20.0);

    out.clear();
    render_standard(&frame(&placed, 1.0, 2.0, &tuning, &typo), &mut out);
    let t = texts(&out);
    assert_eq!(t[0].opacity, 1.0);
    assert_eq!(t[0].anchor.y, 540.0);
}

#[test]
fn snap_scales_about_canvas_center_with_shadow() {
    let (tuning, typo) = (StyleTuning::default(), Typography::default());
    let placed = lines(&["pow"]);
    let mut out = Vec::new();
    render_snap(&frame(&placed, 0.0, 2.0, &tuning, &typo), &mut out);
    let t = texts(&out)[0];
    assert!(matches!(t.fill, Some(TextPaint::HorizontalGradient { .. })));
    assert!(t.shadow.is_some());
    let center = Point::new(960.0, 540.0);
    assert_eq!(t.transform * center, center);
    assert_eq!(t.transform.as_coeffs()[0], 4.0);

    out.clear();
    render_snap(&frame(&placed, 0.3, 2.0, &tuning, &typo), &mut out);
    assert_eq!(texts(&out)[0].transform, Affine::IDENTITY);
}

#[test]
fn karaoke_wipe_clips_filled_copy() {
    let (tuning, typo) = (StyleTuning::default(), Typography::default());
    let placed = lines(&["sing along"]);
    let width = placed[0].width as f64;
    let left = 960.0 - width / 2.0;

    let mut out = Vec::new();
    render_karaoke(&frame(&placed, 1.0, 2.4, &tuning, &typo), &mut out);
    assert_eq!(out.len(), 4);
    let DrawCommand::Text(outline) = &out[0] else {
        panic!("expected outline first");
    };
    assert!(outline.fill.is_none());
    assert!(outline.stroke.is_some());
    let DrawCommand::PushClip { rect } = &out[1] else {
        panic!("expected clip");
    };
    assert!((rect.x0 - left).abs() < 1e-9);
    assert!((rect.width() - width * 0.5).abs() < 1e-6);
    assert!(matches!(&out[2], DrawCommand::Text(t) if t.fill.is_some()));
    assert_eq!(out[3], DrawCommand::PopClip);
}

#[test]
fn karaoke_skips_fill_before_start_and_fills_degenerate_segments() {
    let (tuning, typo) = (StyleTuning::default(), Typography::default());
    let placed = lines(&["x"]);

    let mut out = Vec::new();
    render_karaoke(&frame(&placed, 0.0, 2.0, &tuning, &typo), &mut out);
    assert_eq!(out.len(), 1);

    out.clear();
    render_karaoke(&frame(&placed, 0.0, 0.0, &tuning, &typo), &mut out);
    let DrawCommand::PushClip { rect } = &out[1] else {
        panic!("expected clip");
    };
    assert!((rect.width() - placed[0].width as f64).abs() < 1e-6);
}

#[test]
fn signal_emits_one_glowing_draw_per_visible_char() {
    let (tuning, typo) = (StyleTuning::default(), Typography::default());
    let placed = lines(&["ab c"]);
    let mut out = Vec::new();
    render_signal(
        &frame(&placed, 0.5, 2.0, &tuning, &typo),
        &mut FixedAdvance,
        &mut out,
    );
    let t = texts(&out);
    assert_eq!(t.len(), 3);
    assert!(t.iter().all(|d| d.glow.is_some() && d.align == TextAlign::Left));

    let advance = 20.0 * 0.55;
    let left = 960.0 - placed[0].width as f64 / 2.0;
    assert!((t[0].anchor.x - left).abs() < 1e-4);
    assert!((t[1].anchor.x - (left + advance)).abs() < 1e-4);
    assert!((t[2].anchor.x - (left + 3.0 * advance)).abs() < 1e-4);

    let expected = 540.0 + (3.0f64 * 8.0 + 3.0 * 0.5).sin() * 15.0;
    assert!((t[2].anchor.y - expected).abs() < 1e-9);
}

#[test]
fn glitch_draws_three_passes_with_white_last() {
    let tuning = StyleTuning {
        glitch_probability: 0.0,
        ..StyleTuning::default()
    };
    let typo = Typography::default();
    let placed = lines(&["zap"]);
    let mut rng = StdRng::seed_from_u64(3);
    let mut out = Vec::new();
    render_glitch(&frame(&placed, 0.5, 2.0, &tuning, &typo), &mut rng, &mut out);
    let t = texts(&out);
    assert_eq!(t.len(), 3);
    assert_eq!(t[0].anchor.x, 964.0);
    assert_eq!(t[1].anchor.x, 956.0);
    assert_eq!(t[2].anchor, Point::new(960.0, 540.0));
    assert_eq!(
        t[2].fill,
        Some(TextPaint::Solid {
            color: Rgba8::WHITE
        })
    );
}

#[test]
fn glitch_jitter_moves_every_pass_together() {
    let tuning = StyleTuning {
        glitch_probability: 1.0,
        ..StyleTuning::default()
    };
    let typo = Typography::default();
    let placed = lines(&["zap"]);
    let mut rng = StdRng::seed_from_u64(11);
    let mut out = Vec::new();
    render_glitch(&frame(&placed, 0.5, 2.0, &tuning, &typo), &mut rng, &mut out);
    let t = texts(&out);
    let d = t[2].anchor - Point::new(960.0, 540.0);
    assert!(d.x.abs() <= 10.0 && d.y.abs() <= 10.0);
    let red = t[0].anchor - t[2].anchor;
    let cyan = t[1].anchor - t[2].anchor;
    assert!((red - Vec2::new(4.0, 0.0)).hypot() < 1e-9);
    assert!((cyan - Vec2::new(-4.0, 0.0)).hypot() < 1e-9);
}
