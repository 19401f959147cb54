use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::assets::cache::AssetCache;
use crate::assets::loader::{FsMediaLoader, MediaLoader};
use crate::capture::pipeline::{CapturePipeline, CaptureState, ExportArtifact};
use crate::compose::compositor::Compositor;
use crate::compose::plan::FramePlan;
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::playback::clock::{ManualClock, PlaybackClock};
use crate::playback::frame_loop::FrameLoop;
use crate::render::backend::FrameRGBA;
use crate::render::cpu::{CpuRenderer, CpuRendererOpts};
use crate::scene::project::Project;
use crate::text::engine::TextLayoutEngine;
use crate::timeline::index::resolve_active_asset;
use crate::timeline::model::{MediaKind, Timeline};

/// Environment variable overriding [`PlayerOpts::video_cache_capacity`].
pub const VIDEO_CACHE_CAPACITY_ENV: &str = "LYRISYNC_VIDEO_CACHE_CAPACITY";

/// Session options not stored in the project file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerOpts {
    /// Decoded video frames kept per clip.
    pub video_cache_capacity: usize,
    /// Request every asset on [`Player::start`] instead of on first use.
    pub preload: bool,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        let video_cache_capacity = std::env::var(VIDEO_CACHE_CAPACITY_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(CpuRendererOpts::default().video_cache_capacity);
        Self {
            video_cache_capacity,
            preload: true,
        }
    }
}

/// One playback session: timeline, media, text and the frame loop.
///
/// Time always comes from the [`PlaybackClock`] the host passes in; the player never advances
/// it.
pub struct Player {
    title: String,
    timeline: Timeline,
    compositor: Compositor,
    cache: AssetCache,
    text: TextLayoutEngine,
    renderer: CpuRenderer,
    rng: StdRng,
    frame_loop: FrameLoop,
    opts: PlayerOpts,
}

impl Player {
    /// Create a session for `project`, loading media through `loader`.
    pub fn new(
        project: &Project,
        loader: Arc<dyn MediaLoader>,
        text: TextLayoutEngine,
        opts: PlayerOpts,
    ) -> Self {
        Self {
            title: project.title.clone(),
            timeline: project.timeline(),
            compositor: Compositor::from_project(project),
            cache: AssetCache::new(loader),
            text,
            renderer: CpuRenderer::new(CpuRendererOpts {
                video_cache_capacity: opts.video_cache_capacity,
            }),
            rng: StdRng::seed_from_u64(project.seed),
            frame_loop: FrameLoop::new(),
            opts,
        }
    }

    /// Create a session whose media and font paths are relative to `base_dir`.
    ///
    /// An unreadable or invalid font is logged and text falls back to estimated layout without
    /// glyphs.
    pub fn open(project: &Project, base_dir: &Path, opts: PlayerOpts) -> LyrisyncResult<Self> {
        let mut text = TextLayoutEngine::new();
        if let Some(font_path) = project.font_path(base_dir) {
            match std::fs::read(&font_path)
                .with_context(|| format!("read font '{}'", font_path.display()))
            {
                Ok(bytes) => {
                    if let Err(e) = text.register_font(bytes) {
                        tracing::warn!(error = %e, "font rejected; drawing without glyphs");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "font unavailable; drawing without glyphs"),
            }
        }
        let loader = Arc::new(FsMediaLoader::new(base_dir));
        Ok(Self::new(project, loader, text, opts))
    }

    /// Session title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Sorted session timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Session media cache.
    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Mutable media cache, e.g. to retry a failed asset.
    pub fn cache_mut(&mut self) -> &mut AssetCache {
        &mut self.cache
    }

    /// Session compositor.
    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Return `true` while a frame is scheduled.
    pub fn is_running(&self) -> bool {
        self.frame_loop.is_scheduled()
    }

    /// Request every visual in the timeline.
    pub fn preload(&mut self) {
        for asset in self.timeline.assets() {
            self.cache.ensure(asset);
        }
    }

    /// Start playback and schedule the first frame.
    pub fn start(&mut self, clock: &mut dyn PlaybackClock) {
        if self.opts.preload {
            self.preload();
        }
        clock.play();
        self.frame_loop.request();
        tracing::debug!(t = clock.current_time(), "player started");
    }

    /// Handle a fired frame callback.
    ///
    /// Returns `Ok(None)` when no frame was scheduled (stopped or torn down). Otherwise renders
    /// the frame at the clock's time and schedules the next one only while the clock plays.
    pub fn on_frame(&mut self, clock: &dyn PlaybackClock) -> LyrisyncResult<Option<FrameRGBA>> {
        if self.frame_loop.take().is_none() {
            return Ok(None);
        }
        let frame = self.render_at(clock.current_time())?;
        if clock.is_playing() {
            self.frame_loop.request();
        }
        Ok(Some(frame))
    }

    /// Jump playback to `t`.
    pub fn seek(&mut self, clock: &mut dyn PlaybackClock, t: f64) {
        clock.seek(t);
        self.compositor.reset();
    }

    /// Build the draw plan for time `t`.
    pub fn plan_at(&mut self, t: f64) -> FramePlan {
        self.prepare(t);
        self.compositor.compute_frame(
            t,
            &self.timeline,
            &self.title,
            &self.cache,
            &mut self.text,
            &mut self.rng,
        )
    }

    /// Render the frame for time `t`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn render_at(&mut self, t: f64) -> LyrisyncResult<FrameRGBA> {
        let plan = self.plan_at(t);
        self.renderer.render(&plan, &self.cache, &mut self.text)
    }

    /// Render and capture frames, stepping `clock` by `dt` seconds, until playback ends.
    ///
    /// Frames are taken at `0, dt, 2*dt, ...` strictly before the clock's end, so a clip of
    /// `duration * fps` frames matches the audio length. An export still armed or recording when
    /// the frame chain stops is cancelled.
    pub fn record_offline(
        &mut self,
        capture: &mut CapturePipeline,
        clock: &mut ManualClock,
        dt: f64,
    ) -> LyrisyncResult<Option<ExportArtifact>> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(LyrisyncError::validation("frame step must be finite and > 0"));
        }
        let mut artifact = None;
        while artifact.is_none() {
            let Some(frame) = self.on_frame(clock)? else {
                break;
            };
            artifact = capture.on_frame(&frame)?;
            if artifact.is_some() {
                break;
            }
            clock.advance(dt);
            if clock.take_ended() {
                artifact = capture.on_playback_ended()?;
            }
        }
        if artifact.is_none() && capture.state() != CaptureState::Idle {
            artifact = capture.cancel()?;
        }
        Ok(artifact)
    }

    /// Cancel the pending frame and pause playback and video.
    pub fn stop(&mut self, clock: &mut dyn PlaybackClock) {
        self.frame_loop.cancel();
        clock.pause();
        self.cache.set_active_video(None);
        tracing::debug!("player stopped");
    }

    /// Cancel the pending frame and release every media resource.
    pub fn teardown(&mut self) {
        self.frame_loop.cancel();
        self.cache.teardown();
        self.renderer.release();
        self.compositor.reset();
        tracing::debug!("player torn down");
    }

    // Applies finished loads, requests the active and next visuals, and makes the active
    // video the only one playing before the frame is composed.
    fn prepare(&mut self, t: f64) {
        self.cache.poll();
        let active = resolve_active_asset(self.timeline.assets(), t);
        let upcoming = active.map_or(0, |i| i + 1);
        if let Some(next) = self.timeline.assets().get(upcoming) {
            self.cache.ensure(next);
        }
        let playing = active.map(|i| &self.timeline.assets()[i]).and_then(|asset| {
            self.cache.ensure(asset);
            (asset.kind == MediaKind::Video).then_some(&asset.media)
        });
        self.cache.set_active_video(playing);
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("title", &self.title)
            .field("cache", &self.cache)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/player.rs"]
mod tests;
