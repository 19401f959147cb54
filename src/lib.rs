//! Lyrisync composites timed lyrics over timed image and video backdrops.
//!
//! A session is built from a [`Project`]:
//!
//! - The timeline resolves the active lyric segment and visual for a playback time
//! - The [`Compositor`] turns that into a [`FramePlan`] of draw commands
//! - The [`CpuRenderer`] rasterizes plans into [`FrameRGBA`] buffers
//! - A [`Player`] chains this once per frame against a [`PlaybackClock`]
//! - A [`CapturePipeline`] records the frames and the session audio to a video file
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

/// Easing and per-style animation math.
pub mod animation;
/// Background media loading and caching.
pub mod assets;
/// Export capture.
pub mod capture;
/// Frame composition into draw plans.
pub mod compose;
/// Encoding sinks.
pub mod encode;
/// Clock, frame loop and playback sessions.
pub mod playback;
/// Rasterization of draw plans.
pub mod render;
/// Project files.
pub mod scene;
/// Text measurement and layout.
pub mod text;
/// Timeline model and lookup.
pub mod timeline;

pub use crate::foundation::core::{
    Affine, Canvas, Fps, FrameIndex, Framing, Point, Rect, Rgba8, Vec2,
};
pub use crate::foundation::error::{LyrisyncError, LyrisyncResult};

pub use crate::animation::style::{AnimationStyle, StyleTuning};
pub use crate::assets::cache::{AssetCache, LoadState};
pub use crate::assets::loader::{FsMediaLoader, LoadedMedia, MediaLoader};
pub use crate::capture::codec::{CodecVariant, EncoderProbe, FfmpegEncoderProbe};
pub use crate::capture::pipeline::{
    CaptureOpts, CapturePipeline, CaptureState, ExportArtifact, ExportRequest, FfmpegSinkFactory,
    SinkFactory,
};
pub use crate::compose::compositor::Compositor;
pub use crate::compose::plan::{DrawCommand, FramePlan, RenderState};
pub use crate::compose::typography::Typography;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::playback::clock::{ManualClock, PlaybackClock};
pub use crate::playback::frame_loop::FrameLoop;
pub use crate::playback::player::{Player, PlayerOpts};
pub use crate::render::backend::FrameRGBA;
pub use crate::render::cpu::{CpuRenderer, CpuRendererOpts};
pub use crate::scene::project::Project;
pub use crate::text::engine::TextLayoutEngine;
pub use crate::text::measure::{FontSpec, MeasureText};
pub use crate::timeline::index::{resolve_active_asset, resolve_active_segment};
pub use crate::timeline::model::{LyricSegment, MediaKind, MediaRef, Timeline, VisualAsset};
