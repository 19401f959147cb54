use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::animation::ease::Ease;
use crate::foundation::core::Vec2;
use crate::foundation::math::clamp01;

/// Lyric text animation, selected once per session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationStyle {
    /// Fade in while sliding up.
    #[default]
    Standard,
    /// Punch in from a large scale with a cubic ease-out.
    Snap,
    /// Outline with a left-to-right fill wipe.
    Karaoke,
    /// Per-character traveling sine wave.
    Signal,
    /// Chromatic split with random frame jitter.
    Glitch,
}

impl AnimationStyle {
    /// All styles, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Standard,
        Self::Snap,
        Self::Karaoke,
        Self::Signal,
        Self::Glitch,
    ];

    /// Lowercase identifier.
    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Snap => "snap",
            Self::Karaoke => "karaoke",
            Self::Signal => "signal",
            Self::Glitch => "glitch",
        }
    }
}

/// Timing and motion constants that shape how each style feels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleTuning {
    /// Seconds for the standard fade-in.
    pub standard_fade_secs: f64,
    /// Pixels the standard style slides up from.
    pub standard_slide_px: f64,
    /// Seconds for the snap scale-down.
    pub snap_secs: f64,
    /// Scale snap text starts at.
    pub snap_start_scale: f64,
    /// Multiplier on karaoke progress; values above 1 finish the wipe early.
    pub karaoke_lead: f64,
    /// Angular speed of the signal wave (radians per second).
    pub signal_frequency: f64,
    /// Phase step between adjacent characters (radians).
    pub signal_phase_step: f64,
    /// Signal wave amplitude in pixels.
    pub signal_amplitude_px: f64,
    /// Probability that a glitch frame jitters.
    pub glitch_probability: f64,
    /// Maximum glitch jitter in pixels along each axis.
    pub glitch_jitter_px: f64,
    /// Horizontal offset of the red and cyan glitch passes.
    pub glitch_split_px: f64,
    /// Seconds an image takes to reach full Ken Burns zoom.
    pub ken_burns_secs: f64,
    /// Extra scale reached at full Ken Burns zoom.
    pub ken_burns_zoom: f64,
    /// Opacity of the dimming layer.
    pub dim_opacity: f32,
    /// Intro title ends this many seconds before the first lyric.
    pub intro_lead_secs: f64,
    /// Seconds for the intro title fade in and fade out.
    pub intro_fade_secs: f64,
}

impl Default for StyleTuning {
    fn default() -> Self {
        Self {
            standard_fade_secs: 0.5,
            standard_slide_px: 20.0,
            snap_secs: 0.25,
            snap_start_scale: 4.0,
            karaoke_lead: 1.2,
            signal_frequency: 8.0,
            signal_phase_step: 0.5,
            signal_amplitude_px: 15.0,
            glitch_probability: 0.2,
            glitch_jitter_px: 10.0,
            glitch_split_px: 4.0,
            ken_burns_secs: 10.0,
            ken_burns_zoom: 0.1,
            dim_opacity: 0.4,
            intro_lead_secs: 0.5,
            intro_fade_secs: 1.0,
        }
    }
}

/// Opacity and downward offset of standard-style text `elapsed` seconds into a segment.
pub fn standard_reveal(elapsed: f64, tuning: &StyleTuning) -> (f64, f64) {
    let alpha = Ease::Linear.over(elapsed, tuning.standard_fade_secs);
    (alpha, tuning.standard_slide_px * (1.0 - alpha))
}

/// Snap-style scale. Starts at `snap_start_scale` and settles at exactly 1.
pub fn snap_scale(elapsed: f64, tuning: &StyleTuning) -> f64 {
    let p = Ease::OutCubic.over(elapsed, tuning.snap_secs);
    if p >= 1.0 {
        return 1.0;
    }
    tuning.snap_start_scale - (tuning.snap_start_scale - 1.0) * p
}

/// Fraction of the line width revealed by the karaoke wipe.
///
/// Segments with zero or negative duration count as fully revealed.
pub fn karaoke_fill(elapsed: f64, duration: f64, tuning: &StyleTuning) -> f64 {
    let progress = if duration > 0.0 {
        elapsed / duration
    } else {
        1.0
    };
    clamp01(progress * tuning.karaoke_lead)
}

/// Vertical offset of character `index` in the signal wave at global time `t`.
pub fn signal_offset(t: f64, index: usize, tuning: &StyleTuning) -> f64 {
    (t * tuning.signal_frequency + index as f64 * tuning.signal_phase_step).sin()
        * tuning.signal_amplitude_px
}

/// Whole-block jitter for one glitch frame; zero on most frames.
pub fn glitch_jitter(rng: &mut impl Rng, tuning: &StyleTuning) -> Vec2 {
    if rng.random::<f64>() >= tuning.glitch_probability {
        return Vec2::ZERO;
    }
    let j = tuning.glitch_jitter_px.abs();
    if j == 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(rng.random_range(-j..=j), rng.random_range(-j..=j))
}

/// Ken Burns scale for an image that has been active for `active_for` seconds.
pub fn ken_burns_scale(active_for: f64, tuning: &StyleTuning) -> f64 {
    1.0 + Ease::Linear.over(active_for, tuning.ken_burns_secs) * tuning.ken_burns_zoom
}

/// Return `true` while the intro title should be shown instead of lyrics.
pub fn is_intro(t: f64, first_lyric_start: Option<f64>, tuning: &StyleTuning) -> bool {
    match first_lyric_start {
        Some(start) => t < start - tuning.intro_lead_secs,
        None => false,
    }
}

/// Intro title opacity: fades in over the opening window and out over the window before the
/// first lyric.
///
/// The fade-out window ends at `first_lyric_start`, while [`is_intro`] ends the phase
/// `intro_lead_secs` earlier. With the default tuning the title is cut at half opacity, leaving
/// a short empty gap before the first line.
pub fn intro_alpha(t: f64, first_lyric_start: f64, tuning: &StyleTuning) -> f64 {
    let fade_in = Ease::Linear.over(t, tuning.intro_fade_secs);
    let fade_out = Ease::Linear.over(first_lyric_start - t, tuning.intro_fade_secs);
    fade_in.min(fade_out)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/style.rs"]
mod tests;
