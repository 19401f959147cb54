use std::collections::BTreeSet;
use std::fmt;
use std::process::{Command, Stdio};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{LyrisyncError, LyrisyncResult};

/// Container and codec pair an export can be written with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecVariant {
    /// WebM with VP9 video and Opus audio.
    WebmVp9,
    /// WebM with VP8 video and Opus audio.
    WebmVp8,
    /// MP4 with H.264 video and AAC audio.
    Mp4H264,
}

impl CodecVariant {
    /// Default preference order: higher quality first, then the baseline.
    pub const PREFERRED: [Self; 3] = [Self::WebmVp9, Self::WebmVp8, Self::Mp4H264];

    /// Output file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebmVp9 | Self::WebmVp8 => "webm",
            Self::Mp4H264 => "mp4",
        }
    }

    /// `ffmpeg` muxer name.
    pub fn muxer(self) -> &'static str {
        match self {
            Self::WebmVp9 | Self::WebmVp8 => "webm",
            Self::Mp4H264 => "mp4",
        }
    }

    /// `ffmpeg` video encoder name.
    pub fn video_encoder(self) -> &'static str {
        match self {
            Self::WebmVp9 => "libvpx-vp9",
            Self::WebmVp8 => "libvpx",
            Self::Mp4H264 => "libx264",
        }
    }

    /// `ffmpeg` audio encoder name.
    pub fn audio_encoder(self) -> &'static str {
        match self {
            Self::WebmVp9 | Self::WebmVp8 => "libopus",
            Self::Mp4H264 => "aac",
        }
    }

    /// Short name accepted on the command line.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::WebmVp9 => "vp9",
            Self::WebmVp8 => "vp8",
            Self::Mp4H264 => "h264",
        }
    }
}

impl fmt::Display for CodecVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for CodecVariant {
    type Err = LyrisyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vp9" | "webm_vp9" => Ok(Self::WebmVp9),
            "vp8" | "webm_vp8" => Ok(Self::WebmVp8),
            "h264" | "mp4" | "mp4_h264" => Ok(Self::Mp4H264),
            other => Err(LyrisyncError::validation(format!(
                "unknown codec '{other}' (expected vp9, vp8 or h264)"
            ))),
        }
    }
}

/// Reports which encoders the capture backend can use.
pub trait EncoderProbe {
    /// Names of the available encoders.
    fn available_encoders(&self) -> LyrisyncResult<BTreeSet<String>>;
}

/// Asks the system `ffmpeg` for its encoder list.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegEncoderProbe;

impl EncoderProbe for FfmpegEncoderProbe {
    fn available_encoders(&self) -> LyrisyncResult<BTreeSet<String>> {
        let out = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .context("run 'ffmpeg -encoders'")?;
        if !out.status.success() {
            return Err(LyrisyncError::capture(format!(
                "ffmpeg -encoders exited with status {}",
                out.status
            )));
        }
        Ok(parse_encoder_list(&String::from_utf8_lossy(&out.stdout)))
    }
}

/// Parse the table printed by `ffmpeg -encoders`.
///
/// Rows after the `------` separator look like ` V....D libx264   description`.
pub fn parse_encoder_list(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|l| {
            let mut cols = l.split_whitespace();
            let flags = cols.next()?;
            let name = cols.next()?;
            (flags.len() == 6).then(|| name.to_owned())
        })
        .collect()
}

/// Pick the first codec in `preferred` whose encoders are all available.
///
/// Audio encoders only count when the export carries audio.
pub fn select_codec(
    preferred: &[CodecVariant],
    probe: &dyn EncoderProbe,
    with_audio: bool,
) -> LyrisyncResult<CodecVariant> {
    let available = probe.available_encoders().map_err(|e| {
        LyrisyncError::capture(format!("could not query available video encoders: {e}"))
    })?;
    for &codec in preferred {
        let video_ok = available.contains(codec.video_encoder());
        let audio_ok = !with_audio || available.contains(codec.audio_encoder());
        if video_ok && audio_ok {
            return Ok(codec);
        }
        tracing::debug!(%codec, video_ok, audio_ok, "codec unavailable; trying next");
    }
    Err(LyrisyncError::capture(
        "no supported video encoder is available for export",
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/capture/codec.rs"]
mod tests;
