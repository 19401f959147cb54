use std::path::{Path, PathBuf};

use crate::foundation::error::{LyrisyncError, LyrisyncResult};

/// Basic metadata about a looping background clip.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Absolute source path used for probing/decoding.
    #[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
    pub source_path: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
    /// Clip duration in seconds; zero when unknown.
    pub duration_sec: f64,
}

impl VideoSourceInfo {
    /// Native frame rate of the clip, or 0 when unknown.
    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }

    /// Source time for a clip that has been playing for `active_for` seconds, looping at its end.
    ///
    /// Clips of unknown length hold their first frame.
    pub fn loop_time(&self, active_for: f64) -> f64 {
        if self.duration_sec.is_nan() || self.duration_sec <= 0.0 || !active_for.is_finite() {
            return 0.0;
        }
        active_for.max(0.0).rem_euclid(self.duration_sec)
    }
}

/// Probe source video metadata through `ffprobe`.
#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path) -> LyrisyncResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| LyrisyncError::asset(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(LyrisyncError::asset(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| LyrisyncError::asset(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| LyrisyncError::asset("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| LyrisyncError::asset("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| LyrisyncError::asset("missing video height from ffprobe"))?;

    let (fps_num, fps_den) =
        parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1")).unwrap_or((0, 1));
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Probe source video metadata through `ffprobe`.
///
/// Returns an error when `media-ffmpeg` feature is disabled.
pub fn probe_video(_source_path: &Path) -> LyrisyncResult<VideoSourceInfo> {
    Err(LyrisyncError::asset(
        "video assets require the 'media-ffmpeg' feature",
    ))
}

#[cfg(feature = "media-ffmpeg")]
/// Decode a single RGBA frame from source video at `source_time_sec`.
pub fn decode_video_frame_rgba8(
    source: &VideoSourceInfo,
    source_time_sec: f64,
) -> LyrisyncResult<Vec<u8>> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{source_time_sec:.6}")])
        .arg("-i")
        .arg(&source.source_path)
        .args([
            "-an", "-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1",
        ])
        .output()
        .map_err(|e| LyrisyncError::asset(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(LyrisyncError::asset(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = source.width as usize * source.height as usize * 4;
    if expected_len == 0 {
        return Err(LyrisyncError::asset(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    if out.stdout.len() < expected_len {
        return Err(LyrisyncError::asset(format!(
            "decoded video frame too short: got {} bytes, expected {expected_len}",
            out.stdout.len()
        )));
    }

    let mut frame = out.stdout;
    frame.truncate(expected_len);
    Ok(frame)
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Decode a single RGBA frame from source video at `source_time_sec`.
///
/// Returns an error when `media-ffmpeg` feature is disabled.
pub fn decode_video_frame_rgba8(
    _source: &VideoSourceInfo,
    _source_time_sec: f64,
) -> LyrisyncResult<Vec<u8>> {
    Err(LyrisyncError::asset(
        "video assets require the 'media-ffmpeg' feature",
    ))
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}
