use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use super::*;
use crate::playback::clock::ManualClock;

#[derive(Default)]
struct Log {
    begun: Option<SinkConfig>,
    frames: Vec<u64>,
    ended: bool,
}

struct FakeSink {
    path: PathBuf,
    log: Arc<Mutex<Log>>,
    fail_push_after: Option<u64>,
    fail_end: bool,
}

impl FrameSink for FakeSink {
    fn begin(&mut self, cfg: SinkConfig) -> LyrisyncResult<()> {
        self.log.lock().unwrap().begun = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &FrameRGBA) -> LyrisyncResult<()> {
        if self.fail_push_after.is_some_and(|n| idx.0 >= n) {
            return Err(LyrisyncError::capture("encoder went away"));
        }
        self.log.lock().unwrap().frames.push(idx.0);
        Ok(())
    }

    fn end(&mut self) -> LyrisyncResult<()> {
        let mut log = self.log.lock().unwrap();
        log.ended = true;
        if !log.frames.is_empty() {
            std::fs::write(&self.path, format!("{} frames", log.frames.len())).unwrap();
        }
        if self.fail_end {
            return Err(LyrisyncError::capture("ffmpeg exited with status 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeFactory {
    log: Arc<Mutex<Log>>,
    fail_create: bool,
    fail_push_after: Option<u64>,
    fail_end: bool,
}

impl SinkFactory for FakeFactory {
    fn create(&self, _codec: CodecVariant, path: &Path) -> LyrisyncResult<Box<dyn FrameSink>> {
        if self.fail_create {
            return Err(LyrisyncError::asset("audio tap unavailable"));
        }
        Ok(Box::new(FakeSink {
            path: path.to_path_buf(),
            log: self.log.clone(),
            fail_push_after: self.fail_push_after,
            fail_end: self.fail_end,
        }))
    }
}

struct Encoders(&'static [&'static str]);

impl EncoderProbe for Encoders {
    fn available_encoders(&self) -> LyrisyncResult<BTreeSet<String>> {
        Ok(self.0.iter().map(|s| s.to_string()).collect())
    }
}

fn request(title: &str) -> ExportRequest {
    ExportRequest {
        title: title.into(),
        width: 4,
        height: 4,
        fps: Fps { num: 10, den: 1 },
        audio: None,
    }
}

fn frame() -> FrameRGBA {
    FrameRGBA {
        width: 4,
        height: 4,
        data: vec![0; 64],
        premultiplied: true,
    }
}

fn pipeline(dir: &Path, factory: FakeFactory) -> CapturePipeline {
    CapturePipeline::new(
        CaptureOpts::new(dir),
        Box::new(Encoders(&["libvpx", "libvpx-vp9", "libopus"])),
        Box::new(factory),
    )
}

#[test]
fn full_lifecycle_writes_titled_file() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FakeFactory::default();
    let mut p = pipeline(dir.path(), factory.clone());
    let mut clock = ManualClock::new(1.0);
    clock.play();
    clock.advance(0.4);

    let t0 = Instant::now();
    p.request_export(&request("Night Drive!"), t0, &mut clock).unwrap();
    assert_eq!(p.state(), CaptureState::Arming);
    assert_eq!(clock.current_time(), 0.0);
    assert!(!clock.is_playing());

    // Frames before recording are not captured.
    assert!(p.on_frame(&frame()).unwrap().is_none());
    assert_eq!(p.poll(t0 + Duration::from_millis(100), &mut clock), CaptureState::Arming);
    assert_eq!(p.poll(t0 + Duration::from_millis(500), &mut clock), CaptureState::Recording);
    assert!(clock.is_playing());

    for _ in 0..5 {
        assert!(p.on_frame(&frame()).unwrap().is_none());
    }
    assert_eq!(p.frames_captured(), 5);

    let art = p.on_playback_ended().unwrap().expect("artifact");
    assert_eq!(p.state(), CaptureState::Idle);
    assert_eq!(art.path, dir.path().join("Night_Drive.webm"));
    assert_eq!(art.codec, CodecVariant::WebmVp9);
    assert_eq!(art.frames, 5);
    assert!((art.duration_secs - 0.5).abs() < 1e-9);
    assert!(art.path.exists());
    assert!(!dir.path().join("Night_Drive.partial.webm").exists());

    let log = factory.log.lock().unwrap();
    assert_eq!(log.frames, vec![0, 1, 2, 3, 4]);
    assert!(log.ended);
    assert_eq!(log.begun.as_ref().map(|c| c.codec), Some(CodecVariant::WebmVp9));
}

#[test]
fn second_request_is_rejected_while_busy() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(dir.path(), FakeFactory::default());
    let mut clock = ManualClock::new(1.0);
    let t0 = Instant::now();
    p.request_export(&request("a"), t0, &mut clock).unwrap();
    let err = p.request_export(&request("b"), t0, &mut clock).unwrap_err();
    assert_eq!(err.to_string(), "capture error: export already in progress");

    p.poll(t0 + Duration::from_secs(1), &mut clock);
    assert!(p.request_export(&request("b"), t0, &mut clock).is_err());
    assert_eq!(p.state(), CaptureState::Recording);
}

#[test]
fn setup_failure_returns_to_idle_without_touching_playback() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FakeFactory {
        fail_create: true,
        ..FakeFactory::default()
    };
    let mut p = pipeline(dir.path(), factory);
    let mut clock = ManualClock::new(2.0);
    clock.play();
    clock.advance(1.0);

    let err = p
        .request_export(&request("x"), Instant::now(), &mut clock)
        .unwrap_err();
    assert!(matches!(err, LyrisyncError::Capture(_)));
    assert_eq!(p.state(), CaptureState::Idle);
    assert_eq!(clock.current_time(), 1.0);
    assert!(clock.is_playing());
}

#[test]
fn missing_encoders_abort_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = CapturePipeline::new(
        CaptureOpts::new(dir.path()),
        Box::new(Encoders(&[])),
        Box::new(FakeFactory::default()),
    );
    let mut clock = ManualClock::new(1.0);
    assert!(p.request_export(&request("x"), Instant::now(), &mut clock).is_err());
    assert_eq!(p.state(), CaptureState::Idle);
}

#[test]
fn cancel_mid_recording_keeps_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(dir.path(), FakeFactory::default());
    let mut clock = ManualClock::new(10.0);
    let t0 = Instant::now();
    p.request_export(&request("take"), t0, &mut clock).unwrap();
    p.poll(t0 + Duration::from_secs(1), &mut clock);
    p.on_frame(&frame()).unwrap();
    p.on_frame(&frame()).unwrap();

    let art = p.cancel().unwrap().expect("flushed");
    assert_eq!(art.frames, 2);
    assert!(art.path.exists());
    assert_eq!(p.state(), CaptureState::Idle);
    assert!(p.cancel().unwrap().is_none());
}

#[test]
fn cancel_while_arming_discards() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(dir.path(), FakeFactory::default());
    let mut clock = ManualClock::new(10.0);
    p.request_export(&request("gone"), Instant::now(), &mut clock).unwrap();
    assert!(p.cancel().unwrap().is_none());
    assert_eq!(p.state(), CaptureState::Idle);
    assert!(!dir.path().join("gone.partial.webm").exists());
    assert!(!dir.path().join("gone.webm").exists());
}

#[test]
fn sink_failure_finalizes_what_was_captured() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FakeFactory {
        fail_push_after: Some(3),
        ..FakeFactory::default()
    };
    let mut p = pipeline(dir.path(), factory);
    let mut clock = ManualClock::new(10.0);
    let t0 = Instant::now();
    p.request_export(&request("flaky"), t0, &mut clock).unwrap();
    p.poll(t0 + Duration::from_secs(1), &mut clock);
    for _ in 0..3 {
        assert!(p.on_frame(&frame()).unwrap().is_none());
    }
    let art = p.on_frame(&frame()).unwrap().expect("finalized");
    assert_eq!(art.frames, 3);
    assert_eq!(p.state(), CaptureState::Idle);
}

#[test]
fn existing_files_are_not_overwritten_by_default() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("song.webm"), b"old").unwrap();
    let mut p = pipeline(dir.path(), FakeFactory::default());
    let mut clock = ManualClock::new(1.0);
    let t0 = Instant::now();
    p.request_export(&request("song"), t0, &mut clock).unwrap();
    p.poll(t0 + Duration::from_secs(1), &mut clock);
    let art = p.on_playback_ended().unwrap().unwrap();
    assert_eq!(art.path, dir.path().join("song_1.webm"));
    assert_eq!(std::fs::read(dir.path().join("song.webm")).unwrap(), b"old");
}

#[test]
fn export_stems_are_sanitized() {
    assert_eq!(export_file_stem("  Night   Drive "), "Night_Drive");
    assert_eq!(export_file_stem("a/b\\c:d"), "abcd");
    assert_eq!(export_file_stem("rock-n_roll 2"), "rock-n_roll_2");
    assert_eq!(export_file_stem("夜に駆ける"), "夜に駆ける");
    assert_eq!(export_file_stem("Café Noir"), "Café_Noir");
    assert_eq!(export_file_stem("dir/\u{7}name"), "dirname");
    assert_eq!(export_file_stem("???"), FALLBACK_EXPORT_STEM);
    assert_eq!(export_file_stem(""), FALLBACK_EXPORT_STEM);
}

#[test]
fn encoder_crash_keeps_captured_frames() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FakeFactory {
        fail_push_after: Some(2),
        fail_end: true,
        ..FakeFactory::default()
    };
    let mut p = pipeline(dir.path(), factory);
    let mut clock = ManualClock::new(10.0);
    let t0 = Instant::now();
    p.request_export(&request("take"), t0, &mut clock).unwrap();
    p.poll(t0 + Duration::from_secs(1), &mut clock);
    for _ in 0..2 {
        assert!(p.on_frame(&frame()).unwrap().is_none());
    }
    let art = p.on_frame(&frame()).unwrap().expect("kept");
    assert_eq!(art.frames, 2);
    assert_eq!(art.path, dir.path().join("take.webm"));
    assert!(art.path.exists());
    assert!(!dir.path().join("take.partial.webm").exists());
    assert_eq!(p.state(), CaptureState::Idle);
}

#[test]
fn failed_close_with_nothing_written_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FakeFactory {
        fail_end: true,
        ..FakeFactory::default()
    };
    let mut p = pipeline(dir.path(), factory);
    let mut clock = ManualClock::new(10.0);
    let t0 = Instant::now();
    p.request_export(&request("empty"), t0, &mut clock).unwrap();
    p.poll(t0 + Duration::from_secs(1), &mut clock);
    let err = p.on_playback_ended().unwrap_err();
    assert!(matches!(err, LyrisyncError::Capture(_)));
    assert_eq!(p.state(), CaptureState::Idle);
    assert!(!dir.path().join("empty.webm").exists());
}
