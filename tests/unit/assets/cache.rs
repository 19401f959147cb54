use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::*;
use crate::foundation::error::LyrisyncError;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct FakeLoader {
    images: HashMap<String, (u32, u32)>,
    videos: HashMap<String, f64>,
    calls: AtomicUsize,
    gate: Mutex<()>,
}

impl FakeLoader {
    fn with_image(mut self, name: &str, w: u32, h: u32) -> Self {
        self.images.insert(name.to_owned(), (w, h));
        self
    }

    fn with_video(mut self, name: &str, duration: f64) -> Self {
        self.videos.insert(name.to_owned(), duration);
        self
    }

    fn hold(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap()
    }
}

impl MediaLoader for FakeLoader {
    fn load(&self, media: &MediaRef, kind: MediaKind) -> LyrisyncResult<LoadedMedia> {
        let _gate = self.gate.lock().unwrap();
        self.calls.fetch_add(1, Ordering::SeqCst);
        match kind {
            MediaKind::Image => {
                let (w, h) = self
                    .images
                    .get(media.as_str())
                    .copied()
                    .ok_or_else(|| LyrisyncError::asset(format!("no image {media}")))?;
                Ok(LoadedMedia::Image(Arc::new(DecodedImage {
                    width: w,
                    height: h,
                    rgba8_premul: Arc::new(vec![255; (w * h * 4) as usize]),
                })))
            }
            MediaKind::Video => {
                let duration_sec = self
                    .videos
                    .get(media.as_str())
                    .copied()
                    .ok_or_else(|| LyrisyncError::asset(format!("no video {media}")))?;
                Ok(LoadedMedia::Video(Arc::new(VideoSourceInfo {
                    source_path: media.as_str().into(),
                    width: 8,
                    height: 8,
                    fps_num: 30,
                    fps_den: 1,
                    duration_sec,
                })))
            }
        }
    }
}

fn cache_with(loader: FakeLoader) -> (AssetCache, Arc<FakeLoader>) {
    let loader = Arc::new(loader);
    (AssetCache::new(loader.clone()), loader)
}

#[test]
fn ensure_is_non_blocking_and_idempotent() {
    let (mut cache, loader) = cache_with(FakeLoader::default().with_image("a.png", 4, 2));
    let asset = VisualAsset::image(0.0, "a.png");

    let guard = loader.hold();
    assert_eq!(cache.ensure(&asset).state, LoadState::Pending);
    assert_eq!(cache.ensure(&asset).state, LoadState::Pending);
    assert!(!cache.is_ready(&asset.media));
    drop(guard);

    assert!(cache.wait_idle(WAIT));
    assert!(cache.is_ready(&asset.media));
    assert_eq!(cache.ensure(&asset).intrinsic_size(), Some((4, 2)));
    assert_eq!(cache.len(), 1);
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    assert!(cache.image(&asset.media).is_some());
    assert!(cache.video(&asset.media).is_none());
}

#[test]
fn failures_are_recorded_not_raised() {
    let (mut cache, _loader) = cache_with(FakeLoader::default());
    let asset = VisualAsset::image(0.0, "missing.png");
    cache.ensure(&asset);
    assert!(cache.wait_idle(WAIT));

    let entry = cache.get(&asset.media).unwrap();
    assert!(matches!(entry.state, LoadState::Failed(ref msg) if msg.contains("missing.png")));
    assert!(entry.media.is_none());
}

#[test]
fn failed_entries_reload_only_on_retry() {
    let (mut cache, loader) = cache_with(FakeLoader::default());
    let asset = VisualAsset::image(0.0, "missing.png");
    cache.ensure(&asset);
    assert!(cache.wait_idle(WAIT));
    cache.ensure(&asset);
    assert!(cache.wait_idle(WAIT));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);

    assert!(cache.retry(&asset.media));
    assert_eq!(cache.get(&asset.media).unwrap().state, LoadState::Pending);
    assert!(cache.wait_idle(WAIT));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);

    assert!(!cache.retry(&MediaRef::new("never-seen.png")));
}

#[test]
fn retry_is_a_no_op_for_ready_entries() {
    let (mut cache, _loader) = cache_with(FakeLoader::default().with_image("a.png", 1, 1));
    let asset = VisualAsset::image(0.0, "a.png");
    cache.ensure(&asset);
    assert!(cache.wait_idle(WAIT));
    assert!(!cache.retry(&asset.media));
    assert!(cache.is_ready(&asset.media));
}

#[test]
fn video_entries_expose_probe_info() {
    let (mut cache, _loader) = cache_with(FakeLoader::default().with_video("clip.mp4", 2.0));
    let asset = VisualAsset::video(0.0, "clip.mp4");
    cache.ensure(&asset);
    assert!(cache.wait_idle(WAIT));
    assert!(cache.is_ready(&asset.media));
    assert_eq!(cache.video(&asset.media).unwrap().duration_sec, 2.0);
}

#[test]
fn only_one_video_plays_at_a_time() {
    let (mut cache, _loader) = cache_with(
        FakeLoader::default()
            .with_video("a.mp4", 1.0)
            .with_video("b.mp4", 1.0)
            .with_image("c.png", 1, 1),
    );
    let a = VisualAsset::video(0.0, "a.mp4");
    let b = VisualAsset::video(5.0, "b.mp4");
    let c = VisualAsset::image(9.0, "c.png");
    cache.ensure(&a);
    cache.ensure(&b);
    cache.ensure(&c);

    cache.set_active_video(Some(&a.media));
    assert_eq!(cache.playing_video(), Some(&a.media));
    cache.set_active_video(Some(&b.media));
    assert_eq!(cache.playing_video(), Some(&b.media));
    assert!(!cache.get(&a.media).unwrap().playing);

    cache.set_active_video(Some(&c.media));
    assert_eq!(cache.playing_video(), None);
    assert!(!cache.get(&c.media).unwrap().playing);
}

#[test]
fn teardown_releases_entries_and_drops_late_loads() {
    let (mut cache, loader) = cache_with(FakeLoader::default().with_video("a.mp4", 1.0));
    let a = VisualAsset::video(0.0, "a.mp4");

    let guard = loader.hold();
    cache.ensure(&a);
    cache.set_active_video(Some(&a.media));
    cache.teardown();
    assert!(cache.is_empty());
    assert_eq!(cache.playing_video(), None);
    drop(guard);

    assert!(cache.wait_idle(WAIT));
    assert!(cache.is_empty());
    assert_eq!(cache.in_flight(), 0);
}
