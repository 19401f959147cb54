use serde::{Deserialize, Serialize};
use std::fmt;

/// One timed lyric line.
///
/// Active while `start_time <= t < end_time`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LyricSegment {
    /// Start time in seconds.
    #[serde(alias = "startTime")]
    pub start_time: f64,
    /// End time in seconds (exclusive).
    #[serde(alias = "endTime")]
    pub end_time: f64,
    /// Text to display.
    pub text: String,
}

impl LyricSegment {
    /// Create a segment.
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
        }
    }

    /// Segment length in seconds. May be zero or negative for malformed input.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Return `true` when `t` lies inside `[start_time, end_time)`.
    pub fn contains(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time
    }
}

/// Kind of media behind a [`VisualAsset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Muted looping video clip.
    Video,
}

/// Opaque reference to a media resource (project-relative path or handle).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub String);

impl MediaRef {
    /// Create a media reference.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A visual that becomes active at `time_index` and stays active until the next one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualAsset {
    /// Activation time in seconds.
    #[serde(alias = "timeIndex")]
    pub time_index: f64,
    /// Media behind this visual.
    #[serde(alias = "mediaRef", alias = "url")]
    pub media: MediaRef,
    /// Image or video.
    #[serde(alias = "type")]
    pub kind: MediaKind,
    /// Prompt text the visual was generated from. Informational only.
    #[serde(default, alias = "promptText")]
    pub prompt: String,
}

impl VisualAsset {
    /// Create a still-image asset.
    pub fn image(time_index: f64, media: impl Into<String>) -> Self {
        Self {
            time_index,
            media: MediaRef::new(media),
            kind: MediaKind::Image,
            prompt: String::new(),
        }
    }

    /// Create a video asset.
    pub fn video(time_index: f64, media: impl Into<String>) -> Self {
        Self {
            time_index,
            media: MediaRef::new(media),
            kind: MediaKind::Video,
            prompt: String::new(),
        }
    }
}

/// Immutable per-session lyric and visual timelines, each ordered by start time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    segments: Vec<LyricSegment>,
    assets: Vec<VisualAsset>,
}

impl Timeline {
    /// Build a timeline. Both lists are stably sorted by start time; nothing is rejected.
    pub fn new(mut segments: Vec<LyricSegment>, mut assets: Vec<VisualAsset>) -> Self {
        if !segments.is_sorted_by(|a, b| a.start_time <= b.start_time) {
            tracing::debug!("lyric segments out of order; sorting");
            segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        }
        if !assets.is_sorted_by(|a, b| a.time_index <= b.time_index) {
            tracing::debug!("visual assets out of order; sorting");
            assets.sort_by(|a, b| a.time_index.total_cmp(&b.time_index));
        }
        Self { segments, assets }
    }

    /// Lyric segments in start order.
    pub fn segments(&self) -> &[LyricSegment] {
        &self.segments
    }

    /// Visual assets in activation order.
    pub fn assets(&self) -> &[VisualAsset] {
        &self.assets
    }

    /// First lyric start, if any lyrics exist.
    pub fn first_lyric_start(&self) -> Option<f64> {
        self.segments.first().map(|s| s.start_time)
    }

    /// Latest end time over all segments and asset activations.
    pub fn content_end(&self) -> f64 {
        let seg_end = self
            .segments
            .iter()
            .map(|s| s.end_time)
            .fold(0.0f64, f64::max);
        let asset_end = self
            .assets
            .iter()
            .map(|a| a.time_index)
            .fold(0.0f64, f64::max);
        seg_end.max(asset_end)
    }
}
