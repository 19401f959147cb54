use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::animation::style::{AnimationStyle, StyleTuning};
use crate::assets::loader::normalize_rel_path;
use crate::compose::typography::Typography;
use crate::foundation::core::{Canvas, Fps, Framing};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::timeline::model::{LyricSegment, Timeline, VisualAsset};

/// One lyric-video session as stored on disk.
///
/// Timeline semantics (ordering, overlaps, durations) are never rejected here; the compositor
/// clamps malformed data at draw time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Project {
    /// Session title, shown during the intro and used to name exports.
    #[serde(default)]
    pub title: String,
    /// Wide or tall output.
    #[serde(default)]
    pub framing: Framing,
    /// Lyric animation style.
    #[serde(default)]
    pub style: AnimationStyle,
    /// Capture frame rate.
    #[serde(default)]
    pub fps: Fps,
    /// Seed for per-frame randomness.
    #[serde(default)]
    pub seed: u64,
    /// Audio track, relative to the project file.
    #[serde(default)]
    pub audio: Option<PathBuf>,
    /// Font file, relative to the project file.
    #[serde(default)]
    pub font: Option<PathBuf>,
    /// Playback length in seconds. Defaults to the end of the last segment or asset.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Timed lyric lines.
    #[serde(default)]
    pub segments: Vec<LyricSegment>,
    /// Timed background visuals.
    #[serde(default)]
    pub assets: Vec<VisualAsset>,
    /// Animation feel constants.
    #[serde(default)]
    pub tuning: StyleTuning,
    /// Text sizes and colors.
    #[serde(default)]
    pub typography: Typography,
}

impl Project {
    /// Parse a project from JSON.
    pub fn from_reader<R: std::io::Read>(r: R) -> LyrisyncResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| LyrisyncError::serde(format!("parse project JSON: {e}")))
    }

    /// Parse a project from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> LyrisyncResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            LyrisyncError::validation(format!("open project JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check structural constraints: frame rate, duration and media paths.
    pub fn validate(&self) -> LyrisyncResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if let Some(d) = self.duration
            && !(d.is_finite() && d > 0.0)
        {
            return Err(LyrisyncError::validation(format!(
                "duration must be finite and > 0, got {d}"
            )));
        }
        for (i, asset) in self.assets.iter().enumerate() {
            if let Err(LyrisyncError::Validation(msg)) = normalize_rel_path(asset.media.as_str()) {
                return Err(LyrisyncError::validation(format!("assets[{i}]: {msg}")));
            }
            if !asset.time_index.is_finite() {
                return Err(LyrisyncError::validation(format!(
                    "assets[{i}]: time_index must be finite"
                )));
            }
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if !seg.start_time.is_finite() || !seg.end_time.is_finite() {
                return Err(LyrisyncError::validation(format!(
                    "segments[{i}]: times must be finite"
                )));
            }
        }
        let t = &self.typography;
        for (name, v) in [
            ("lyric_size", t.lyric_size),
            ("title_size", t.title_size),
            ("max_line_width", t.max_line_width),
            ("line_height", t.line_height),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(LyrisyncError::validation(format!(
                    "typography.{name} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }

    /// Output canvas for the chosen framing.
    pub fn canvas(&self) -> Canvas {
        self.framing.canvas()
    }

    /// Sorted timeline built from the project's segments and assets.
    pub fn timeline(&self) -> Timeline {
        Timeline::new(self.segments.clone(), self.assets.clone())
    }

    /// Playback length: the explicit duration, else the end of the timeline content.
    pub fn duration_secs(&self) -> f64 {
        self.duration.unwrap_or_else(|| self.timeline().content_end())
    }

    /// Audio path resolved against `base_dir` when relative.
    pub fn audio_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.audio.as_deref().map(|p| base_dir.join(p))
    }

    /// Font path resolved against `base_dir` when relative.
    pub fn font_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.font.as_deref().map(|p| base_dir.join(p))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/project.rs"]
mod tests;
