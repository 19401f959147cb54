//! Encoding sinks.
//!
//! Sinks consume rendered frames in capture order and are driven by the capture pipeline.

/// `ffmpeg`-based sink (WebM or MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
