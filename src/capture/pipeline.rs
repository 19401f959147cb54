use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::capture::codec::{CodecVariant, EncoderProbe, select_codec};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{LyrisyncError, LyrisyncResult};
use crate::playback::clock::PlaybackClock;
use crate::render::backend::FrameRGBA;

/// File stem used when the session title has no usable characters.
pub const FALLBACK_EXPORT_STEM: &str = "lyric_video";

/// Export lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    /// No export running.
    #[default]
    Idle,
    /// Sink prepared and clock rewound; waiting for the seek to settle.
    Arming,
    /// Playback running and frames being captured.
    Recording,
    /// Sink flushing its output.
    Finalizing,
}

/// Export options.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureOpts {
    /// Codecs to try, most preferred first.
    pub codecs: Vec<CodecVariant>,
    /// Wait between rewinding the clock and starting playback.
    pub settle: Duration,
    /// Directory the exported file is written to.
    pub out_dir: PathBuf,
    /// Replace an existing file with the same name instead of picking a numbered one.
    pub overwrite: bool,
}

impl CaptureOpts {
    /// Default options writing into `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            codecs: CodecVariant::PREFERRED.to_vec(),
            settle: Duration::from_millis(500),
            out_dir: out_dir.into(),
            overwrite: false,
        }
    }
}

/// What is being exported.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRequest {
    /// Session title; names the output file.
    pub title: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Capture frame rate.
    pub fps: Fps,
    /// Audio muxed with the frames.
    pub audio: Option<PathBuf>,
}

/// A finished export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportArtifact {
    /// Final file path.
    pub path: PathBuf,
    /// Codec the file was written with.
    pub codec: CodecVariant,
    /// Frames captured.
    pub frames: u64,
    /// Captured video length in seconds.
    pub duration_secs: f64,
}

/// Creates the sink an export records into.
pub trait SinkFactory {
    /// Create a sink writing `codec` output to `path`.
    fn create(&self, codec: CodecVariant, path: &Path) -> LyrisyncResult<Box<dyn FrameSink>>;
}

/// Builds [`FfmpegSink`]s.
#[derive(Clone, Copy, Debug)]
pub struct FfmpegSinkFactory {
    /// Background used to flatten transparent pixels.
    pub bg_rgba: [u8; 4],
}

impl Default for FfmpegSinkFactory {
    fn default() -> Self {
        Self {
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn create(&self, _codec: CodecVariant, path: &Path) -> LyrisyncResult<Box<dyn FrameSink>> {
        let mut opts = FfmpegSinkOpts::new(path);
        opts.bg_rgba = self.bg_rgba;
        Ok(Box::new(FfmpegSink::new(opts)))
    }
}

struct Recording {
    codec: CodecVariant,
    fps: Fps,
    sink: Box<dyn FrameSink>,
    partial: PathBuf,
    target: PathBuf,
    armed_at: Instant,
    frames: u64,
}

/// Drives one export at a time through `Idle -> Arming -> Recording -> Finalizing -> Idle`.
///
/// The host calls [`CapturePipeline::poll`] and [`CapturePipeline::on_frame`] from its frame loop
/// and [`CapturePipeline::on_playback_ended`] when the clock reports the end.
pub struct CapturePipeline {
    opts: CaptureOpts,
    probe: Box<dyn EncoderProbe>,
    factory: Box<dyn SinkFactory>,
    state: CaptureState,
    active: Option<Recording>,
}

impl CapturePipeline {
    /// Create an idle pipeline.
    pub fn new(
        opts: CaptureOpts,
        probe: Box<dyn EncoderProbe>,
        factory: Box<dyn SinkFactory>,
    ) -> Self {
        Self {
            opts,
            probe,
            factory,
            state: CaptureState::Idle,
            active: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Frames captured by the running export.
    pub fn frames_captured(&self) -> u64 {
        self.active.as_ref().map_or(0, |r| r.frames)
    }

    /// Start an export: pick a codec, open the sink, and rewind `clock` to zero.
    ///
    /// Fails with a capture error, leaving the pipeline idle and playback untouched, when an
    /// export is already running or the sink cannot be prepared.
    #[tracing::instrument(level = "info", skip_all, fields(title = %req.title))]
    pub fn request_export(
        &mut self,
        req: &ExportRequest,
        now: Instant,
        clock: &mut dyn PlaybackClock,
    ) -> LyrisyncResult<()> {
        if self.state != CaptureState::Idle {
            return Err(LyrisyncError::capture("export already in progress"));
        }

        let codec = select_codec(&self.opts.codecs, self.probe.as_ref(), req.audio.is_some())?;
        let recording = self.arm(req, codec, now).map_err(|e| match e {
            LyrisyncError::Capture(_) => e,
            other => LyrisyncError::capture(format!("could not start export: {other}")),
        })?;

        clock.pause();
        clock.seek(0.0);
        tracing::info!(%codec, out = %recording.target.display(), "export armed");
        self.active = Some(recording);
        self.state = CaptureState::Arming;
        Ok(())
    }

    /// Advance time-based transitions. Starts playback once the settle delay has passed.
    pub fn poll(&mut self, now: Instant, clock: &mut dyn PlaybackClock) -> CaptureState {
        if self.state == CaptureState::Arming
            && let Some(rec) = self.active.as_ref()
            && now.saturating_duration_since(rec.armed_at) >= self.opts.settle
        {
            clock.play();
            self.state = CaptureState::Recording;
            tracing::info!("recording started");
        }
        self.state
    }

    /// Capture a rendered frame. Ignored unless recording.
    ///
    /// A sink failure stops the recording and finalizes what was captured so far.
    pub fn on_frame(&mut self, frame: &FrameRGBA) -> LyrisyncResult<Option<ExportArtifact>> {
        if self.state != CaptureState::Recording {
            return Ok(None);
        }
        let Some(rec) = self.active.as_mut() else {
            return Ok(None);
        };
        match rec.sink.push_frame(FrameIndex(rec.frames), frame) {
            Ok(()) => {
                rec.frames += 1;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, frames = rec.frames, "frame capture failed; finalizing");
                self.finalize().map(Some)
            }
        }
    }

    /// Handle the playback-ended signal: finalize a running recording.
    pub fn on_playback_ended(&mut self) -> LyrisyncResult<Option<ExportArtifact>> {
        match self.state {
            CaptureState::Recording => self.finalize().map(Some),
            CaptureState::Arming => {
                self.abort();
                Ok(None)
            }
            CaptureState::Idle | CaptureState::Finalizing => Ok(None),
        }
    }

    /// Stop any export. A recording is flushed and kept; an armed export is discarded.
    pub fn cancel(&mut self) -> LyrisyncResult<Option<ExportArtifact>> {
        match self.state {
            CaptureState::Recording => self.finalize().map(Some),
            CaptureState::Arming => {
                self.abort();
                Ok(None)
            }
            CaptureState::Idle | CaptureState::Finalizing => Ok(None),
        }
    }

    fn arm(
        &self,
        req: &ExportRequest,
        codec: CodecVariant,
        now: Instant,
    ) -> LyrisyncResult<Recording> {
        std::fs::create_dir_all(&self.opts.out_dir).with_context(|| {
            format!(
                "create export directory '{}'",
                self.opts.out_dir.display()
            )
        })?;
        let stem = export_file_stem(&req.title);
        let target = self.target_path(&stem, codec.extension());
        let partial = self
            .opts
            .out_dir
            .join(format!("{stem}.partial.{}", codec.extension()));

        let mut sink = self.factory.create(codec, &partial)?;
        sink.begin(SinkConfig {
            width: req.width,
            height: req.height,
            fps: req.fps,
            codec,
            audio: req.audio.clone(),
        })?;
        Ok(Recording {
            codec,
            fps: req.fps,
            sink,
            partial,
            target,
            armed_at: now,
            frames: 0,
        })
    }

    fn target_path(&self, stem: &str, ext: &str) -> PathBuf {
        let first = self.opts.out_dir.join(format!("{stem}.{ext}"));
        if self.opts.overwrite || !first.exists() {
            return first;
        }
        (1u32..)
            .map(|n| self.opts.out_dir.join(format!("{stem}_{n}.{ext}")))
            .find(|p| !p.exists())
            .unwrap_or(first)
    }

    #[tracing::instrument(level = "info", skip_all)]
    fn finalize(&mut self) -> LyrisyncResult<ExportArtifact> {
        self.state = CaptureState::Finalizing;
        let Some(mut rec) = self.active.take() else {
            self.state = CaptureState::Idle;
            return Err(LyrisyncError::capture("no recording to finalize"));
        };
        let ended = rec.sink.end();
        self.state = CaptureState::Idle;
        let captured = std::fs::metadata(&rec.partial).is_ok_and(|m| m.len() > 0);
        if let Err(e) = ended {
            if !captured {
                tracing::warn!(error = %e, partial = %rec.partial.display(), "export finalize failed");
                return Err(LyrisyncError::capture(format!(
                    "export could not be finalized: {e}"
                )));
            }
            tracing::warn!(
                error = %e,
                frames = rec.frames,
                "sink did not close cleanly; keeping captured output"
            );
        }

        if captured || rec.partial.exists() {
            std::fs::rename(&rec.partial, &rec.target).with_context(|| {
                format!(
                    "move '{}' to '{}'",
                    rec.partial.display(),
                    rec.target.display()
                )
            })?;
        }
        let artifact = ExportArtifact {
            path: rec.target,
            codec: rec.codec,
            frames: rec.frames,
            duration_secs: rec.fps.frames_to_secs(rec.frames),
        };
        tracing::info!(path = %artifact.path.display(), frames = artifact.frames, "export finished");
        Ok(artifact)
    }

    fn abort(&mut self) {
        if let Some(mut rec) = self.active.take() {
            if let Err(e) = rec.sink.end() {
                tracing::debug!(error = %e, "discarding armed export sink");
            }
            if rec.partial.exists()
                && let Err(e) = std::fs::remove_file(&rec.partial)
            {
                tracing::warn!(error = %e, "could not remove partial export");
            }
        }
        self.state = CaptureState::Idle;
        tracing::info!("export aborted before recording");
    }
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("opts", &self.opts)
            .field("state", &self.state)
            .field("frames", &self.frames_captured())
            .finish()
    }
}

/// File stem for an export of a session titled `title`.
///
/// Keeps letters and digits in any script plus `-` and `_`; whitespace runs become `_`.
/// Path separators, reserved punctuation and control characters are dropped.
pub fn export_file_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut pending_gap = false;
    for c in title.trim().chars() {
        if c.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if !(c.is_alphanumeric() || c == '-' || c == '_') {
            continue;
        }
        if pending_gap && !stem.is_empty() {
            stem.push('_');
        }
        pending_gap = false;
        stem.push(c);
    }
    if stem.is_empty() {
        FALLBACK_EXPORT_STEM.to_owned()
    } else {
        stem
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/pipeline.rs"]
mod tests;
